//! # medeval-runtime
//!
//! Async runtime for the medical transcription evaluation pipeline.
//!
//! `medeval-core` defines the labels, the record, and the consensus rule;
//! this crate adds everything that touches a language model:
//!
//! - the provider abstraction and the OpenAI-compatible client
//!   ([`providers`])
//! - the Spanish prompt templates ([`prompts`])
//! - the per-domain judge wrapping one LLM call per verdict ([`judge`])
//! - the optional supervisor refinement step ([`refinement`])
//! - the sequential pipeline gluing judges and consensus together
//!   ([`orchestrator`])
//! - verdict caching ([`cache`]) and token accounting ([`usage`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use medeval_runtime::{EvaluationPipelineBuilder, LlmProvider};
//!
//! # async fn example(provider: Arc<dyn LlmProvider>) -> Result<(), medeval_runtime::RuntimeError> {
//! let pipeline = EvaluationPipelineBuilder::new()
//!     .provider(provider)
//!     .build()?;
//!
//! let run = pipeline.run("texto original", "texto transcrito").await?;
//! println!("{}", run.record.consensus_explanation);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod judge;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod refinement;
pub mod usage;

pub use judge::{AgentError, DomainJudge};
pub use orchestrator::{
    ConsensusMode, EvaluationPipeline, EvaluationPipelineBuilder, EvaluationRun, PipelineConfig,
    RuntimeError,
};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
#[cfg(feature = "openai")]
pub use providers::{OpenAiProvider, OPENAI_API_KEY_ENV};
pub use refinement::ConsensusRefiner;
pub use usage::{LlmUsage, UsageTracker};

// Convenience re-exports so pipeline consumers rarely need medeval-core
// directly.
pub use medeval_core::{Domain, DomainVerdict, DomainVerdicts, EvaluationRecord, Severity};
