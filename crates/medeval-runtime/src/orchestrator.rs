//! The evaluation pipeline.
//!
//! Four nodes in a fixed sequential order over one shared record:
//! medication judge, dosage judge, consistency judge, consensus. No
//! branching, no retries, no pipeline-level timeout; any provider error
//! propagates unmodified to the caller. The only variation point is the
//! consensus mode: purely deterministic, or preceded by the LLM-mediated
//! refinement step.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use medeval_core::{Consensus, Domain, DomainVerdicts, EvaluationRecord};

use crate::cache::VerdictCache;
use crate::judge::{AgentError, DomainJudge};
use crate::providers::{CompletionConfig, LlmProvider};
use crate::refinement::ConsensusRefiner;
use crate::usage::{LlmUsage, UsageTracker};

/// Errors from the evaluation pipeline.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

/// How domain verdicts are reconciled into the final classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsensusMode {
    /// Apply the precedence rule directly over the domain verdicts.
    #[default]
    Deterministic,

    /// Run the supervisor refinement call first, then the precedence rule.
    /// Degrades to the unfiltered verdicts when the refinement fails.
    LlmRefined,
}

/// Pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Completion settings shared by all agent calls.
    pub completion: CompletionConfig,

    /// Consensus policy.
    pub consensus_mode: ConsensusMode,

    /// Reuse verdicts for repeated input pairs.
    pub cache_verdicts: bool,
}

/// A completed pipeline run with its usage accounting.
#[derive(Debug)]
pub struct EvaluationRun {
    /// The fully populated record.
    pub record: EvaluationRecord,

    /// LLM usage across the run.
    pub usage: LlmUsage,

    /// When the run completed.
    pub evaluated_at: DateTime<Utc>,
}

/// Sequential multi-agent evaluation over a pair of texts.
///
/// # Execution Flow
/// 1. Medication judge
/// 2. Dosage judge
/// 3. Consistency judge
/// 4. Optional supervisor refinement, then deterministic consensus
///
/// Each run owns its record exclusively; concurrent evaluations are the
/// host application's concern and need no coordination here.
pub struct EvaluationPipeline {
    judge: DomainJudge,
    refiner: ConsensusRefiner,
    consensus: Consensus,
    consensus_mode: ConsensusMode,
    usage: Arc<UsageTracker>,
}

impl EvaluationPipeline {
    /// Create a pipeline from an injected provider.
    pub fn new(provider: Arc<dyn LlmProvider>, config: PipelineConfig) -> Self {
        let usage = Arc::new(UsageTracker::new());

        let mut judge = DomainJudge::new(
            provider.clone(),
            config.completion.clone(),
            usage.clone(),
        );
        if config.cache_verdicts {
            judge = judge.with_cache(Arc::new(VerdictCache::default()));
        }

        let refiner = ConsensusRefiner::new(provider, config.completion, usage.clone());

        Self {
            judge,
            refiner,
            consensus: Consensus::new(),
            consensus_mode: config.consensus_mode,
            usage,
        }
    }

    /// Evaluate one transcription against its reference text.
    ///
    /// Returns the record with every field populated, or the first
    /// transport error raised by a domain agent. There is no partial-result
    /// mode: a failed node means no record.
    pub async fn evaluate(
        &self,
        original_text: &str,
        transcribed_text: &str,
    ) -> Result<EvaluationRecord, RuntimeError> {
        let mut record = EvaluationRecord::new(original_text, transcribed_text);
        let mut verdicts = DomainVerdicts::default();

        for domain in Domain::ALL {
            let verdict = self
                .judge
                .judge(domain, original_text, transcribed_text)
                .await?;
            record.apply_verdict(domain, &verdict);
            verdicts.set(domain, verdict);
        }

        if self.consensus_mode == ConsensusMode::LlmRefined {
            verdicts = self.refiner.refine(&verdicts).await;
            // The refined verdicts overwrite the per-domain fields so the
            // record and the final classification always agree.
            for (domain, verdict) in verdicts.iter() {
                record.apply_verdict(domain, verdict);
            }
        }

        let outcome = self.consensus.synthesize(&verdicts);
        record.final_classification = Some(outcome.final_classification);
        record.consensus_explanation = outcome.explanation;
        record.error_details = outcome.error_details;

        Ok(record)
    }

    /// Evaluate and return the record together with run metadata.
    ///
    /// Resets usage counters first, so the reported usage covers exactly
    /// this run.
    pub async fn run(
        &self,
        original_text: &str,
        transcribed_text: &str,
    ) -> Result<EvaluationRun, RuntimeError> {
        self.usage.reset();
        let record = self.evaluate(original_text, transcribed_text).await?;
        Ok(EvaluationRun {
            record,
            usage: self.usage.snapshot(),
            evaluated_at: Utc::now(),
        })
    }

    /// Accumulated usage since the last reset.
    pub fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }
}

/// Builder for [`EvaluationPipeline`].
///
/// The provider is injected explicitly; a missing provider is a
/// construction-time configuration error, never a deferred failure on the
/// first call.
pub struct EvaluationPipelineBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: PipelineConfig,
}

impl EvaluationPipelineBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: PipelineConfig::default(),
        }
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the full configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the consensus mode.
    pub fn consensus_mode(mut self, mode: ConsensusMode) -> Self {
        self.config.consensus_mode = mode;
        self
    }

    /// Enable the verdict cache.
    pub fn cache_verdicts(mut self) -> Self {
        self.config.cache_verdicts = true;
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<EvaluationPipeline, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("no provider set".to_string()))?;
        Ok(EvaluationPipeline::new(provider, self.config))
    }
}

impl Default for EvaluationPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionResponse, ProviderError, TokenUsage};
    use async_trait::async_trait;
    use medeval_core::Severity;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Mock provider replaying scripted responses in call order:
    /// medication, dosage, consistency, then (in refined mode) supervisor.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            let content = self
                .responses
                .lock()
                .pop_front()
                .ok_or_else(|| ProviderError::HttpError("script exhausted".to_string()))?;
            Ok(CompletionResponse {
                content,
                usage: TokenUsage {
                    prompt_tokens: 200,
                    completion_tokens: 40,
                },
                model: "mock".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn pipeline(provider: Arc<ScriptedProvider>) -> EvaluationPipeline {
        EvaluationPipeline::new(provider, PipelineConfig::default())
    }

    fn refined_pipeline(provider: Arc<ScriptedProvider>) -> EvaluationPipeline {
        EvaluationPipeline::new(
            provider,
            PipelineConfig {
                consensus_mode: ConsensusMode::LlmRefined,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn identical_texts_yield_clean_record() {
        let provider = ScriptedProvider::new(&["NINGUNA", "NINGUNA", "NINGUNA"]);
        let text = "El paciente toma ibuprofeno 600 mg cada 8 horas.";

        let record = pipeline(provider).evaluate(text, text).await.unwrap();

        assert_eq!(record.medication_classification, Some(Severity::None));
        assert_eq!(record.dosage_classification, Some(Severity::None));
        assert_eq!(record.consistency_classification, Some(Severity::None));
        assert_eq!(record.final_classification, Some(Severity::None));
        assert!(record.error_details.is_empty());
        assert!(record.consensus_explanation.contains("Clasificación final: NINGUNA"));
    }

    #[tokio::test]
    async fn substituted_drug_yields_critical_medication_error() {
        let provider = ScriptedProvider::new(&[
            "GRAVE\nCelebrex fue sustituido por Cerebyx, un fármaco de otra clase terapéutica.",
            "NINGUNA",
            "NINGUNA",
        ]);

        let record = pipeline(provider)
            .evaluate(
                "Recetado Celebrex 200 mg para el dolor.",
                "Recetado Cerebyx 200 mg para el dolor.",
            )
            .await
            .unwrap();

        assert_eq!(record.medication_classification, Some(Severity::Critical));
        assert_eq!(record.final_classification, Some(Severity::Critical));
        assert_eq!(record.error_details.len(), 1);
        assert!(record.error_details[0].contains("MEDICAMENTOS"));
        assert!(record.consensus_explanation.contains("RECOMENDACIÓN"));
    }

    #[tokio::test]
    async fn allergy_negation_flip_yields_critical_consistency_error() {
        let provider = ScriptedProvider::new(&[
            "NINGUNA",
            "NINGUNA",
            "GRAVE\nEl texto original niega alergias y la transcripción las afirma.",
        ]);

        let record = pipeline(provider)
            .evaluate("No tiene alergias conocidas.", "Tiene alergias conocidas.")
            .await
            .unwrap();

        assert_eq!(record.consistency_classification, Some(Severity::Critical));
        assert_eq!(record.final_classification, Some(Severity::Critical));
        assert!(record.error_details[0].contains("COHERENCIA"));
    }

    #[tokio::test]
    async fn changed_frequency_yields_critical_dosage_error() {
        let provider = ScriptedProvider::new(&[
            "NINGUNA",
            "GRAVE\nLa frecuencia cambió de una vez al día a tres veces al día.",
            "NINGUNA",
        ]);

        let record = pipeline(provider)
            .evaluate(
                "Tomar paracetamol una vez al día.",
                "Tomar paracetamol tres veces al día.",
            )
            .await
            .unwrap();

        assert_eq!(record.dosage_classification, Some(Severity::Critical));
        assert_eq!(record.final_classification, Some(Severity::Critical));
        assert!(record.error_details[0].contains("DOSIS"));
    }

    #[tokio::test]
    async fn minority_minor_yields_none() {
        let provider = ScriptedProvider::new(&[
            "LEVE\nVariante ortográfica del mismo medicamento.",
            "NINGUNA",
            "NINGUNA",
        ]);

        let record = pipeline(provider).evaluate("a", "b").await.unwrap();
        assert_eq!(record.medication_classification, Some(Severity::Minor));
        assert_eq!(record.final_classification, Some(Severity::None));
        // The minor verdict still appears in the details and the record.
        assert_eq!(record.error_details.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_propagates_and_yields_no_record() {
        // Script exhausted after the first call: the second agent fails.
        let provider = ScriptedProvider::new(&["NINGUNA"]);
        let result = pipeline(provider).evaluate("a", "b").await;
        assert!(matches!(result, Err(RuntimeError::Agent(_))));
    }

    #[tokio::test]
    async fn malformed_refinement_degrades_to_unfiltered_rule() {
        let provider = ScriptedProvider::new(&[
            "GRAVE\nCelebrex sustituido por Cerebyx.",
            "NINGUNA",
            "NINGUNA",
            "Lo siento, no puedo responder con JSON.",
        ]);

        let record = refined_pipeline(provider).evaluate("a", "b").await.unwrap();

        // Final classification equals the precedence rule applied to the
        // pre-refinement labels.
        assert_eq!(record.medication_classification, Some(Severity::Critical));
        assert_eq!(record.final_classification, Some(Severity::Critical));
        assert_eq!(record.error_details.len(), 1);
    }

    #[tokio::test]
    async fn refinement_demotes_out_of_scope_verdict() {
        let provider = ScriptedProvider::new(&[
            "GRAVE\nLa dosis cambió de 20 mg a 200 mg.", // medication agent out of its lane
            "GRAVE\nLa dosis cambió de 20 mg a 200 mg.",
            "NINGUNA",
            r#"{"medication_classification": "NINGUNA", "dosage_classification": "GRAVE", "consistency_classification": "NINGUNA", "medication_explanation": "", "dosage_explanation": "La dosis cambió de 20 mg a 200 mg.", "consistency_explanation": ""}"#,
        ]);

        let record = refined_pipeline(provider).evaluate("a", "b").await.unwrap();

        assert_eq!(record.medication_classification, Some(Severity::None));
        assert!(record.medication_explanation.is_empty());
        assert_eq!(record.dosage_classification, Some(Severity::Critical));
        assert_eq!(record.final_classification, Some(Severity::Critical));
        assert_eq!(record.error_details.len(), 1);
        assert!(record.error_details[0].contains("DOSIS"));
    }

    #[tokio::test]
    async fn run_reports_usage_and_timestamp() {
        let provider = ScriptedProvider::new(&["NINGUNA", "NINGUNA", "NINGUNA"]);
        let pipeline = pipeline(provider);

        let run = pipeline.run("a", "a").await.unwrap();
        assert_eq!(run.usage.llm_calls, 3);
        assert_eq!(run.usage.total_tokens, 3 * 240);
        assert_eq!(run.record.final_classification, Some(Severity::None));
    }

    #[tokio::test]
    async fn builder_requires_a_provider() {
        let result = EvaluationPipelineBuilder::new().build();
        assert!(matches!(result, Err(RuntimeError::ProviderNotConfigured(_))));
    }

    #[tokio::test]
    async fn builder_constructs_configured_pipeline() {
        let provider = ScriptedProvider::new(&["NINGUNA", "NINGUNA", "NINGUNA"]);
        let pipeline = EvaluationPipelineBuilder::new()
            .provider(provider)
            .consensus_mode(ConsensusMode::Deterministic)
            .cache_verdicts()
            .build()
            .unwrap();

        let record = pipeline.evaluate("texto", "texto").await.unwrap();
        assert_eq!(record.final_classification, Some(Severity::None));
    }
}
