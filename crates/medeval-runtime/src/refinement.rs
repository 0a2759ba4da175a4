//! LLM-mediated consensus refinement.
//!
//! Before the deterministic consensus rule runs, an optional supervisor
//! call can demote domain verdicts whose explanation strayed outside the
//! reporting agent's declared scope. The supervisor answers with a single
//! JSON object carrying the six label/explanation fields.
//!
//! Failure semantics: refinement never fails an evaluation. A transport
//! error, a response without a JSON object, or undecodable JSON all degrade
//! to the original unfiltered verdicts, logged at warn. Invalid label
//! tokens inside an otherwise valid response are coerced to `NINGUNA`, also
//! with a warning, so no unknown value flows downstream.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

use medeval_core::{Domain, DomainVerdict, DomainVerdicts, Severity};

use crate::prompts::render_supervisor_prompt;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::usage::UsageTracker;

lazy_static! {
    /// First JSON-object-shaped span anywhere in the response.
    static ref EMBEDDED_JSON: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

/// The supervisor's structured response. All fields default so a partial
/// object still decodes; absent labels coerce to `NINGUNA` downstream.
#[derive(Debug, Default, Deserialize)]
struct RefinedFields {
    #[serde(default)]
    medication_classification: String,
    #[serde(default)]
    dosage_classification: String,
    #[serde(default)]
    consistency_classification: String,
    #[serde(default)]
    medication_explanation: String,
    #[serde(default)]
    dosage_explanation: String,
    #[serde(default)]
    consistency_explanation: String,
}

/// Supervisor step re-arbitrating out-of-scope domain verdicts.
pub struct ConsensusRefiner {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    usage: Arc<UsageTracker>,
}

impl ConsensusRefiner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: CompletionConfig,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            provider,
            config,
            usage,
        }
    }

    /// Run the supervisor call and apply its filtering.
    ///
    /// Returns the refined verdicts, or the originals unchanged when the
    /// call or the parse fails.
    pub async fn refine(&self, verdicts: &DomainVerdicts) -> DomainVerdicts {
        let prompt = render_supervisor_prompt(verdicts);

        let response = match self
            .provider
            .complete(vec![ChatMessage::user(prompt)], &self.config)
            .await
        {
            Ok(response) => {
                self.usage.record(&response.usage);
                response
            }
            Err(e) => {
                tracing::warn!(error = %e, "consensus refinement call failed, keeping original verdicts");
                return verdicts.clone();
            }
        };

        tracing::debug!(response = response.content.as_str(), "supervisor response");

        match parse_refined(&response.content) {
            Some(refined) => refined,
            None => {
                tracing::warn!("no decodable JSON in supervisor response, keeping original verdicts");
                verdicts.clone()
            }
        }
    }
}

/// Locate and decode the JSON object embedded in the supervisor response.
fn parse_refined(response: &str) -> Option<DomainVerdicts> {
    let json_str = EMBEDDED_JSON.find(response)?.as_str();
    let fields: RefinedFields = serde_json::from_str(json_str).ok()?;

    let mut refined = DomainVerdicts::default();
    refined.set(
        Domain::Medication,
        coerced_verdict(
            Domain::Medication,
            &fields.medication_classification,
            fields.medication_explanation,
        ),
    );
    refined.set(
        Domain::Dosage,
        coerced_verdict(
            Domain::Dosage,
            &fields.dosage_classification,
            fields.dosage_explanation,
        ),
    );
    refined.set(
        Domain::Consistency,
        coerced_verdict(
            Domain::Consistency,
            &fields.consistency_classification,
            fields.consistency_explanation,
        ),
    );
    Some(refined)
}

fn coerced_verdict(domain: Domain, label: &str, explanation: String) -> DomainVerdict {
    let severity = match Severity::from_token(label) {
        Some(severity) => severity,
        None => {
            tracing::warn!(
                domain = ?domain,
                label = label,
                "invalid severity label from supervisor, coercing to NINGUNA"
            );
            Severity::None
        }
    };
    DomainVerdict::new(severity, explanation)
}
