//! Consensus: reconciles the three domain verdicts into one final severity.
//!
//! The precedence rule is strict and not configurable:
//! 1. Any `GRAVE` verdict forces a `GRAVE` final classification.
//! 2. Otherwise a majority (two or more) of `LEVE` yields `LEVE`.
//! 3. Otherwise a majority of `NINGUNA` yields `NINGUNA`.
//! 4. Without a majority, any remaining `LEVE` yields `LEVE`, else `NINGUNA`.
//!
//! With exactly three domains branch 4 cannot be reached (a split containing
//! all three labels is resolved by rule 1), but the rule is kept total so the
//! same policy holds for any verdict set.

use crate::types::{Domain, DomainVerdicts, Severity};

/// Output of the consensus step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusOutcome {
    pub final_classification: Severity,
    pub explanation: String,
    pub error_details: Vec<String>,
}

/// Deterministic consensus over the three domain verdicts.
pub struct Consensus;

impl Consensus {
    pub fn new() -> Self {
        Self
    }

    /// Apply the precedence rule alone, without composing the report.
    pub fn resolve(&self, verdicts: &DomainVerdicts) -> Severity {
        let severities = [
            verdicts.medication.severity,
            verdicts.dosage.severity,
            verdicts.consistency.severity,
        ];

        if severities.contains(&Severity::Critical) {
            return Severity::Critical;
        }

        let minors = severities.iter().filter(|s| **s == Severity::Minor).count();
        let nones = severities.iter().filter(|s| **s == Severity::None).count();

        if minors >= 2 {
            Severity::Minor
        } else if nones >= 2 {
            Severity::None
        } else if minors > 0 {
            Severity::Minor
        } else {
            Severity::None
        }
    }

    /// Resolve the final severity and compose the human-readable report.
    pub fn synthesize(&self, verdicts: &DomainVerdicts) -> ConsensusOutcome {
        let final_classification = self.resolve(verdicts);
        let error_details = self.collect_error_details(verdicts);

        let mut explanation = format!(
            "Clasificación final: {classification}\n\
             \n\
             Análisis de agentes:\n\
             • Medicamentos: {med}\n\
             • Dosis: {dos}\n\
             • Coherencia: {coh}\n\
             \n\
             Reglas aplicadas:\n\
             • Si cualquiera es GRAVE → final = GRAVE\n\
             • Si la mayoría es LEVE → final = LEVE\n\
             • Si la mayoría son NINGUNA → final = NINGUNA",
            classification = final_classification,
            med = verdicts.medication.severity,
            dos = verdicts.dosage.severity,
            coh = verdicts.consistency.severity,
        );

        if !error_details.is_empty() {
            explanation.push_str("\n\n⚠️ DETALLES DE ERRORES ENCONTRADOS:\n");
            explanation.push_str(&error_details.join("\n"));
        }

        if final_classification == Severity::Critical {
            explanation.push_str(
                "\n\n🚨 RECOMENDACIÓN: Esta transcripción requiere revisión inmediata \
                 por parte de un profesional médico antes de su uso clínico.",
            );
        }

        ConsensusOutcome {
            final_classification,
            explanation,
            error_details,
        }
    }

    /// One tagged line per domain classified above `NINGUNA` with a
    /// non-empty explanation, in pipeline order.
    fn collect_error_details(&self, verdicts: &DomainVerdicts) -> Vec<String> {
        let mut details = Vec::new();

        for (domain, verdict) in verdicts.iter() {
            if verdict.explanation.is_empty() {
                continue;
            }
            match verdict.severity {
                Severity::Critical => details.push(format!(
                    "🔴 ERROR CRÍTICO EN {}: {}",
                    upper_es(domain),
                    verdict.explanation
                )),
                Severity::Minor => details.push(format!(
                    "🟡 Error menor en {}: {}",
                    lower_es(domain),
                    verdict.explanation
                )),
                Severity::None => {}
            }
        }

        details
    }
}

impl Default for Consensus {
    fn default() -> Self {
        Self::new()
    }
}

fn upper_es(domain: Domain) -> &'static str {
    match domain {
        Domain::Medication => "MEDICAMENTOS",
        Domain::Dosage => "DOSIS",
        Domain::Consistency => "COHERENCIA",
    }
}

fn lower_es(domain: Domain) -> &'static str {
    match domain {
        Domain::Medication => "medicamentos",
        Domain::Dosage => "dosis",
        Domain::Consistency => "coherencia",
    }
}
