//! Turn orchestration for the mailpilot email assistant.
//!
//! A turn is: budget the caller's history, ask the model (with the tool
//! catalog attached), run at most one requested tool, ask again without
//! tools, and hand back the reply plus a re-bounded history.
//!
//! Nothing here persists between turns. See [`ConversationOrchestrator`].

pub mod context;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{CharRatioEstimator, ContextBudgeter, TokenEstimator, estimate_tokens};
pub use orchestrator::{
    ConversationOrchestrator, DEFAULT_HISTORY_WINDOW, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_TOOL_HISTORY_TAIL, TurnOutcome,
};
