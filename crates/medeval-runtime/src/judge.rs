//! The generic domain judge.
//!
//! One judge serves all three fidelity aspects; only the instruction
//! template changes per [`Domain`]. Each judgment is exactly one completion
//! call over the two source texts, followed by the deterministic parsing
//! boundary in `medeval-core`.
//!
//! Transport failures are NOT handled here: they propagate to the caller
//! unchanged, with no retry. Parse failures degrade to `NINGUNA` inside the
//! parser.

use std::sync::Arc;
use thiserror::Error;

use medeval_core::{extract_explanation, parse_severity, Domain, DomainVerdict};

use crate::cache::{VerdictCache, VerdictKey};
use crate::prompts::render_domain_prompt;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};
use crate::usage::UsageTracker;

/// Errors from the domain judge.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] ProviderError),
}

/// LLM-backed judge for one fidelity aspect at a time.
///
/// # Isolation Contract
/// Judgments are independent: each reads only the two source texts, never
/// another domain's verdict, so the three domain calls are order-agnostic
/// even though the pipeline runs them sequentially.
pub struct DomainJudge {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    cache: Option<Arc<VerdictCache>>,
    usage: Arc<UsageTracker>,
}

impl DomainJudge {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: CompletionConfig,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            provider,
            config,
            cache: None,
            usage,
        }
    }

    /// Reuse verdicts for repeated input pairs.
    pub fn with_cache(mut self, cache: Arc<VerdictCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Judge one domain over the two source texts.
    ///
    /// The returned verdict's explanation is empty whenever the parsed
    /// severity is `NINGUNA`, regardless of what the model appended.
    pub async fn judge(
        &self,
        domain: Domain,
        original_text: &str,
        transcribed_text: &str,
    ) -> Result<DomainVerdict, AgentError> {
        let key = VerdictKey::new(domain, original_text, transcribed_text);

        if let Some(cache) = &self.cache {
            if let Some(verdict) = cache.get(&key).await {
                tracing::debug!(domain = ?domain, "verdict cache hit");
                return Ok(verdict);
            }
        }

        let prompt = render_domain_prompt(domain, original_text, transcribed_text);
        let response = self
            .provider
            .complete(vec![ChatMessage::user(prompt)], &self.config)
            .await?;
        self.usage.record(&response.usage);

        let raw = response.content.trim();
        tracing::debug!(domain = ?domain, response = raw, "domain agent response");

        let severity = parse_severity(raw);
        let explanation = if severity.is_error() {
            extract_explanation(raw)
        } else {
            String::new()
        };
        let verdict = DomainVerdict::new(severity, explanation);

        if let Some(cache) = &self.cache {
            cache.insert(key, verdict.clone()).await;
        }

        Ok(verdict)
    }
}
