//! Token estimation.
//!
//! Budgets are counted in *estimated* tokens. The default estimator is a
//! character heuristic (~4 characters per token, rounded up): cheap and
//! deterministic, but it can under- or over-count against the real
//! tokenizer of whichever model sits behind the endpoint. Budgets built on
//! it are soft targets. A precise tokenizer can be dropped in through
//! [`TokenEstimator`] without touching the budgeting algorithm.

use mailpilot_core::message::ChatMessage;

/// Estimates the cost of a piece of text in model tokens.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;

    fn estimate_message(&self, message: &ChatMessage) -> usize {
        self.estimate(&message.content)
    }

    fn estimate_messages(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}

/// Fixed characters-per-token ratio.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Estimate with the default 4-chars-per-token heuristic.
pub fn estimate_tokens(text: &str) -> usize {
    CharRatioEstimator::default().estimate(text)
}
