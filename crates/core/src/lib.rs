//! # mailpilot core
//!
//! Domain types, traits, and error definitions for the mailpilot email
//! assistant. This crate has **zero framework dependencies**: it defines the
//! conversation model, the completion-endpoint contract and the mail
//! collaborator contracts that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates, which keeps the orchestration logic testable with
//! in-memory stand-ins for the model and the mailbox.

pub mod error;
pub mod mail;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MailError, ProviderError, Result, ToolError};
pub use mail::{MailRetrieval, MailTransmission, OutgoingMail, RawMail};
pub use message::{ChatMessage, HistoryEntry, MessageToolCall, Role, sanitize_history};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition, Usage};
pub use tool::{ExecutedTool, Tool, ToolInvocationRequest, ToolRegistry, ToolResult};
