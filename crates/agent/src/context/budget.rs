//! History budgeting.
//!
//! Fits a message sequence into an estimated-token budget:
//!
//! 1. A leading system message is always kept, even if it alone exceeds
//!    the budget.
//! 2. The remaining messages are taken newest first until the next one
//!    would overflow. Older messages are dropped as a block; there is no
//!    skipping ahead to smaller ones.
//! 3. The output is returned oldest first, as a subsequence of the input.
//!
//! System messages after the first position are not carried over.

use std::sync::Arc;

use mailpilot_core::message::{ChatMessage, Role};
use tracing::debug;

use crate::context::token::{CharRatioEstimator, TokenEstimator};

/// Default history budget, in estimated tokens.
pub const DEFAULT_HISTORY_BUDGET: usize = 50_000;

#[derive(Clone)]
pub struct ContextBudgeter {
    budget: usize,
    estimator: Arc<dyn TokenEstimator>,
}

impl Default for ContextBudgeter {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_BUDGET)
    }
}

impl ContextBudgeter {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            estimator: Arc::new(CharRatioEstimator::default()),
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Total estimated cost of `messages`.
    pub fn cost(&self, messages: &[ChatMessage]) -> usize {
        self.estimator.estimate_messages(messages)
    }

    /// Return the budgeted subsequence of `messages`, oldest first.
    pub fn fit(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let (head, rest) = match messages.split_first() {
            Some((first, rest)) if first.role == Role::System => (Some(first), rest),
            _ => (None, messages),
        };

        let mut used = head.map_or(0, |m| self.estimator.estimate_message(m));
        let mut kept: Vec<&ChatMessage> = Vec::new();
        for message in rest.iter().rev() {
            if message.role == Role::System {
                continue;
            }
            let cost = self.estimator.estimate_message(message);
            if used + cost > self.budget {
                break;
            }
            used += cost;
            kept.push(message);
        }
        kept.reverse();

        debug!(
            input = messages.len(),
            kept = kept.len() + usize::from(head.is_some()),
            estimated_tokens = used,
            budget = self.budget,
            "Budgeted history"
        );

        head.into_iter().chain(kept).cloned().collect()
    }
}
