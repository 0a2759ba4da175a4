//! Instruction templates for the evaluation agents.
//!
//! The evaluation protocol is Spanish-language and clinical: each template
//! asks for one of the three severity tokens (NINGUNA, LEVE, GRAVE) on the
//! first line, followed by a free-text explanation when an error was found.
//! The judgment policy lives entirely in these templates; the code around
//! them only parses labels and applies the consensus rule.
//!
//! The consistency template is the scope-restricted variant: it explicitly
//! tells the agent to ignore medication and dosage issues, which belong to
//! the other two agents.

use medeval_core::{Domain, DomainVerdicts};

/// Medication-name fidelity template.
///
/// Same drug under a different format or abbreviation is not an error; a
/// barely-recognizable spelling variant is LEVE; a different drug, or drugs
/// added/missing, is GRAVE.
pub const MEDICATION_PROMPT: &str = r#"Eres un experto en medicina clínica y en terminología farmacológica.
Tu tarea es comparar el texto original con la transcripción y evaluar la fidelidad de los nombres de medicamentos.

Instrucciones:
• Considera que conoces los nombres comerciales y genéricos de los fármacos.
• Marca error solo si el medicamento cambia de identidad (por ejemplo, un fármaco distinto o de otra clase terapéutica).
• No marques como error diferencias de formato, abreviaturas o variantes de escritura si el significado clínico es el mismo.
• Haz recuento de los medicamentos mencionados en ambos textos y compáralos.

Clasifica el resultado en una única categoría:
• NINGUNA → el medicamento es el mismo.
• LEVE → variación poco clara de escritura, pero se reconoce como el mismo medicamento.
• GRAVE → el medicamento transcrito corresponde a otro diferente, o aparecen medicamentos no mencionados en el original.

IMPORTANTE: Si la clasificación es GRAVE o LEVE, proporciona una explicación detallada del error encontrado.

TEXTO ORIGINAL:
{original_text}

TEXTO TRANSCRITO:
{transcribed_text}

Formato de respuesta:
1. Primera línea: SOLO la categoría (NINGUNA, LEVE o GRAVE)
2. Si es GRAVE o LEVE: Líneas adicionales con explicación detallada del error específico encontrado."#;

/// Dosage fidelity template: quantity, unit, and frequency.
///
/// Numeric-format differences with identical clinical meaning ("0.5 mg" vs.
/// "medio miligramo") are not errors.
pub const DOSAGE_PROMPT: &str = r#"Eres un experto en farmacología clínica y en posología.
Tu tarea es comparar el texto original con la transcripción y comprobar si la dosis está bien transcrita.

Instrucciones:
• Marca error solo si cambia la cantidad, la unidad o la frecuencia de la dosis.
• Ignora errores en nombres de medicamentos (ya evaluados por otro agente).
• No marques como error diferencias de estilo o de formato si el significado es el mismo (ejemplo: "200 mg/día" y "200 miligramos al día"). Es decir, ignora las abreviaturas.
• No marques como error el formato de números (ejemplo: "0.5 mg" y "medio miligramo" son equivalentes, o "4 días" y "cuatro días") (ejemplo: "38 grados y medio" y "38,5 grados" son equivalentes).
• Presta especial atención a diferencias numéricas que puedan ser críticas para la seguridad del paciente.

Clasifica el resultado en una única categoría:
• NINGUNA → la dosis tiene el mismo significado.
• LEVE → hay una diferencia menor que puede generar ligera confusión, pero no cambia la dosis.
• GRAVE → la dosis, la unidad o la frecuencia han cambiado de forma significativa.

IMPORTANTE: Si la clasificación es GRAVE o LEVE, proporciona una explicación detallada del error encontrado y de la diferencia de la dosis.

TEXTO ORIGINAL:
{original_text}

TEXTO TRANSCRITO:
{transcribed_text}

Formato de respuesta:
1. Primera línea: SOLO la categoría (NINGUNA, LEVE o GRAVE)
2. Si es GRAVE o LEVE: Líneas adicionales con explicación detallada del error específico encontrado."#;

/// Clinical-coherence template (scope-restricted variant).
///
/// A reversal of clinical fact (an allergy negation flip) is GRAVE; omission
/// of a secondary detail is LEVE; medication and dosage issues are out of
/// scope for this agent.
pub const CONSISTENCY_PROMPT: &str = r#"Eres un experto en redacción médica y en coherencia clínica.
Tu tarea es comparar el texto original con la transcripción y verificar si se mantiene la coherencia de la información (síntomas, diagnósticos, alergias, instrucciones).

Instrucciones:
• Marca error solo si cambia el sentido clínico.
• NO tengas en cuenta errores en nombres de medicamentos o dosis (ya evaluados por otros agentes).
• Ignora diferencias de estilo, pequeñas omisiones o reformulaciones que no alteran el significado.
• Presta especial atención a cambios que puedan afectar la seguridad del paciente o el diagnóstico.

Clasifica el resultado en una única categoría:
• NINGUNA → no hay cambios de significado clínico (sin contar medicamentos o dosis).
• LEVE → se omite o cambia un detalle secundario, sin afectar al sentido clínico principal (sin contar medicamentos o dosis).
• GRAVE → cambia el significado de forma importante (ejemplo: de "no tiene alergias" a "tiene alergias" o "he vomitado" a "no he vomitado").

IMPORTANTE: Si la clasificación es GRAVE o LEVE, proporciona una explicación detallada del error encontrado.

TEXTO ORIGINAL:
{original_text}

TEXTO TRANSCRITO:
{transcribed_text}

Formato de respuesta:
1. Primera línea: SOLO la categoría (NINGUNA, LEVE o GRAVE)
2. Si es GRAVE o LEVE: Líneas adicionales con explicación detallada del error específico encontrado."#;

/// Get the instruction template for a domain.
pub fn domain_prompt(domain: Domain) -> &'static str {
    match domain {
        Domain::Medication => MEDICATION_PROMPT,
        Domain::Dosage => DOSAGE_PROMPT,
        Domain::Consistency => CONSISTENCY_PROMPT,
    }
}

/// Interpolate the two source texts into a domain template.
pub fn render_domain_prompt(domain: Domain, original_text: &str, transcribed_text: &str) -> String {
    domain_prompt(domain)
        .replace("{original_text}", original_text)
        .replace("{transcribed_text}", transcribed_text)
}

/// Build the supervisor prompt for the LLM-mediated consensus refinement.
///
/// The supervisor enforces "stay in your lane" discipline: verdicts whose
/// explanation falls outside the reporting agent's declared scope are
/// demoted to NINGUNA, and mixed verdicts are re-derived from the in-scope
/// part only. The response must be a single JSON object with the six
/// label/explanation fields.
pub fn render_supervisor_prompt(verdicts: &DomainVerdicts) -> String {
    format!(
        r#"Eres el SUPERVISOR de una evaluación multi-agente. Tu trabajo es DISCIPLINAR a los agentes que se salen de su especialidad.

CLASIFICACIONES Y EXPLICACIONES RECIBIDAS:
• Medicamentos: {med}
  Explicación: "{med_exp}"
• Dosis: {dos}
  Explicación: "{dos_exp}"
• Coherencia: {coh}
  Explicación: "{coh_exp}"

INSTRUCCIONES para el agente de medicamentos:
• Si reporta un problema que no pertenece a su ámbito (por ejemplo, de dosis o coherencia), ignóralo y clasifícalo como NINGUNA.
• Si reporta varios problemas y ninguno es de su ámbito, clasifícalo como NINGUNA.
• Si reporta varios problemas y algunos son de su ámbito, vuelve a plantear la clasificación y la explicación solo con los problemas de su ámbito.
• Si reporta un problema de MEDICAMENTOS, acepta su clasificación y explicación.

INSTRUCCIONES para el agente de dosis:
• Si reporta un problema que no pertenece a su ámbito (por ejemplo, de medicamentos o coherencia), ignóralo y clasifícalo como NINGUNA.
• Si reporta varios problemas y ninguno es de su ámbito, clasifícalo como NINGUNA.
• Si reporta varios problemas y algunos son de su ámbito, vuelve a plantear la clasificación y la explicación solo con los problemas de su ámbito.
• Si reporta un problema de DOSIS, acepta su clasificación y explicación.

INSTRUCCIONES para el agente de coherencia:
• Si reporta un problema que no pertenece a su ámbito (por ejemplo, de medicamentos o dosis), ignóralo y clasifícalo como NINGUNA.
• Si reporta un problema relacionado con nombres de MEDICAMENTOS o DOSIS, clasifícalo como LEVE.
• Si reporta varios problemas y ninguno es de su ámbito, clasifícalo como NINGUNA.
• Si reporta varios problemas y algunos son de su ámbito, vuelve a plantear la clasificación y la explicación solo con los problemas de su ámbito.
• Si reporta un problema de COHERENCIA, acepta su clasificación y explicación.

Responde SOLO con JSON válido:
{{"medication_classification": "NINGUNA", "dosage_classification": "NINGUNA", "consistency_classification": "NINGUNA", "medication_explanation": "", "dosage_explanation": "", "consistency_explanation": ""}}"#,
        med = verdicts.medication.severity,
        med_exp = verdicts.medication.explanation,
        dos = verdicts.dosage.severity,
        dos_exp = verdicts.dosage.explanation,
        coh = verdicts.consistency.severity,
        coh_exp = verdicts.consistency.explanation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use medeval_core::{DomainVerdict, Severity};

    #[test]
    fn every_domain_template_declares_the_label_contract() {
        for domain in Domain::ALL {
            let prompt = domain_prompt(domain);
            assert!(prompt.contains("NINGUNA"));
            assert!(prompt.contains("LEVE"));
            assert!(prompt.contains("GRAVE"));
            assert!(prompt.contains("Primera línea: SOLO la categoría"));
            assert!(prompt.contains("{original_text}"));
            assert!(prompt.contains("{transcribed_text}"));
        }
    }

    #[test]
    fn consistency_template_excludes_other_domains() {
        assert!(CONSISTENCY_PROMPT.contains("NO tengas en cuenta errores en nombres de medicamentos o dosis"));
    }

    #[test]
    fn render_interpolates_both_texts() {
        let rendered = render_domain_prompt(
            Domain::Dosage,
            "Tomar 200 mg cada 12 horas",
            "Tomar 200 miligramos cada 12 horas",
        );
        assert!(rendered.contains("Tomar 200 mg cada 12 horas"));
        assert!(rendered.contains("Tomar 200 miligramos cada 12 horas"));
        assert!(!rendered.contains("{original_text}"));
        assert!(!rendered.contains("{transcribed_text}"));
    }

    #[test]
    fn supervisor_prompt_reports_all_three_verdicts() {
        let verdicts = DomainVerdicts {
            medication: DomainVerdict::new(Severity::Critical, "fármaco distinto"),
            dosage: DomainVerdict::clean(),
            consistency: DomainVerdict::new(Severity::Minor, "detalle omitido"),
        };
        let prompt = render_supervisor_prompt(&verdicts);
        assert!(prompt.contains("• Medicamentos: GRAVE"));
        assert!(prompt.contains("\"fármaco distinto\""));
        assert!(prompt.contains("• Dosis: NINGUNA"));
        assert!(prompt.contains("• Coherencia: LEVE"));
        assert!(prompt.contains("Responde SOLO con JSON válido"));
    }
}
