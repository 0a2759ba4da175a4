//! Core types for transcription fidelity evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a transcription discrepancy.
///
/// The wire form uses the Spanish tokens of the evaluation protocol:
/// `NINGUNA` (no error), `LEVE` (minor), `GRAVE` (critical).
/// Ordering follows severity: `None < Minor < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    #[serde(rename = "NINGUNA")]
    None,
    #[serde(rename = "LEVE")]
    Minor,
    #[serde(rename = "GRAVE")]
    Critical,
}

impl Severity {
    /// The protocol token for this severity.
    pub fn as_token(&self) -> &'static str {
        match self {
            Severity::None => "NINGUNA",
            Severity::Minor => "LEVE",
            Severity::Critical => "GRAVE",
        }
    }

    /// Parse a single protocol token (case-insensitive). Unknown tokens
    /// yield `None` so callers can apply their own fallback policy.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "NINGUNA" => Some(Severity::None),
            "LEVE" => Some(Severity::Minor),
            "GRAVE" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Whether this severity represents an actual discrepancy.
    pub fn is_error(&self) -> bool {
        !matches!(self, Severity::None)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// The three fidelity aspects evaluated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Medication identity: same drug, different drug, extra/missing drugs.
    Medication,
    /// Dosage: quantity, unit, and frequency.
    Dosage,
    /// Overall clinical coherence: symptoms, diagnoses, allergies, instructions.
    Consistency,
}

impl Domain {
    /// All domains in pipeline order.
    pub const ALL: [Domain; 3] = [Domain::Medication, Domain::Dosage, Domain::Consistency];

    /// Spanish display name used in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Domain::Medication => "Medicamentos",
            Domain::Dosage => "Dosis",
            Domain::Consistency => "Coherencia",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One domain's judgment: a severity plus a free-text justification.
///
/// The explanation is empty if and only if the severity is `None`;
/// the constructor enforces this regardless of what the caller passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVerdict {
    pub severity: Severity,
    pub explanation: String,
}

impl DomainVerdict {
    pub fn new(severity: Severity, explanation: impl Into<String>) -> Self {
        let explanation = if severity.is_error() {
            explanation.into()
        } else {
            String::new()
        };
        Self {
            severity,
            explanation,
        }
    }

    /// A clean verdict: no discrepancy found.
    pub fn clean() -> Self {
        Self::new(Severity::None, "")
    }
}

/// The three domain verdicts feeding the consensus step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVerdicts {
    pub medication: DomainVerdict,
    pub dosage: DomainVerdict,
    pub consistency: DomainVerdict,
}

impl DomainVerdicts {
    /// Verdicts in pipeline order, paired with their domain.
    pub fn iter(&self) -> [(Domain, &DomainVerdict); 3] {
        [
            (Domain::Medication, &self.medication),
            (Domain::Dosage, &self.dosage),
            (Domain::Consistency, &self.consistency),
        ]
    }

    pub fn get(&self, domain: Domain) -> &DomainVerdict {
        match domain {
            Domain::Medication => &self.medication,
            Domain::Dosage => &self.dosage,
            Domain::Consistency => &self.consistency,
        }
    }

    pub fn set(&mut self, domain: Domain, verdict: DomainVerdict) {
        match domain {
            Domain::Medication => self.medication = verdict,
            Domain::Dosage => self.dosage = verdict,
            Domain::Consistency => self.consistency = verdict,
        }
    }
}

impl Default for DomainVerdicts {
    fn default() -> Self {
        Self {
            medication: DomainVerdict::clean(),
            dosage: DomainVerdict::clean(),
            consistency: DomainVerdict::clean(),
        }
    }
}

/// The single record threaded through an evaluation run.
///
/// Created with only the two source texts populated; each pipeline stage
/// fills in its own fields. Serializes to a flat JSON object where empty
/// fields are present as empty strings / empty lists, never omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub original_text: String,
    pub transcribed_text: String,

    /// Per-domain classifications: `null` until the domain agent runs,
    /// which is distinct from an explicit `NINGUNA`.
    pub medication_classification: Option<Severity>,
    pub dosage_classification: Option<Severity>,
    pub consistency_classification: Option<Severity>,

    pub medication_explanation: String,
    pub dosage_explanation: String,
    pub consistency_explanation: String,

    /// Set only by the consensus step.
    pub final_classification: Option<Severity>,
    pub consensus_explanation: String,

    /// One tagged entry per domain classified above `NINGUNA`.
    pub error_details: Vec<String>,
}

impl EvaluationRecord {
    pub fn new(original_text: impl Into<String>, transcribed_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            transcribed_text: transcribed_text.into(),
            medication_classification: None,
            dosage_classification: None,
            consistency_classification: None,
            medication_explanation: String::new(),
            dosage_explanation: String::new(),
            consistency_explanation: String::new(),
            final_classification: None,
            consensus_explanation: String::new(),
            error_details: Vec::new(),
        }
    }

    /// Write one domain's verdict into its designated fields.
    pub fn apply_verdict(&mut self, domain: Domain, verdict: &DomainVerdict) {
        match domain {
            Domain::Medication => {
                self.medication_classification = Some(verdict.severity);
                self.medication_explanation = verdict.explanation.clone();
            }
            Domain::Dosage => {
                self.dosage_classification = Some(verdict.severity);
                self.dosage_explanation = verdict.explanation.clone();
            }
            Domain::Consistency => {
                self.consistency_classification = Some(verdict.severity);
                self.consistency_explanation = verdict.explanation.clone();
            }
        }
    }

    /// Collect the three domain verdicts back out of the record.
    ///
    /// Returns `None` until all three domain agents have run.
    pub fn verdicts(&self) -> Option<DomainVerdicts> {
        Some(DomainVerdicts {
            medication: DomainVerdict::new(
                self.medication_classification?,
                self.medication_explanation.clone(),
            ),
            dosage: DomainVerdict::new(
                self.dosage_classification?,
                self.dosage_explanation.clone(),
            ),
            consistency: DomainVerdict::new(
                self.consistency_classification?,
                self.consistency_explanation.clone(),
            ),
        })
    }
}
