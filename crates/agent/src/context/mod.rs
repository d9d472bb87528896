//! Prompt-size control: token estimation and history budgeting.

pub mod budget;
pub mod token;

pub use budget::{ContextBudgeter, DEFAULT_HISTORY_BUDGET};
pub use token::{CharRatioEstimator, TokenEstimator, estimate_tokens};
