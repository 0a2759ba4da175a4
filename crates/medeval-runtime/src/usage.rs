//! LLM usage accounting for an evaluation run.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated LLM usage across a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Number of LLM calls made
    pub llm_calls: u32,
}

impl LlmUsage {
    /// Fold in the token usage of one completion.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
        self.llm_calls += 1;
    }
}

/// Thread-safe usage accumulator shared between pipeline stages.
#[derive(Debug, Default)]
pub struct UsageTracker {
    inner: Mutex<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion's usage.
    pub fn record(&self, usage: &TokenUsage) {
        self.inner.lock().add(usage);
    }

    /// Snapshot the accumulated usage.
    pub fn snapshot(&self) -> LlmUsage {
        self.inner.lock().clone()
    }

    /// Reset counters for a new run.
    pub fn reset(&self) {
        *self.inner.lock() = LlmUsage::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_accumulates_calls() {
        let tracker = UsageTracker::new();
        tracker.record(&TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 20,
        });
        tracker.record(&TokenUsage {
            prompt_tokens: 50,
            completion_tokens: 10,
        });

        let usage = tracker.snapshot();
        assert_eq!(usage.llm_calls, 2);
        assert_eq!(usage.prompt_tokens, 150);
        assert_eq!(usage.completion_tokens, 30);
        assert_eq!(usage.total_tokens, 180);
    }

    #[test]
    fn reset_clears_counters() {
        let tracker = UsageTracker::new();
        tracker.record(&TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        });
        tracker.reset();
        assert_eq!(tracker.snapshot().llm_calls, 0);
    }
}
