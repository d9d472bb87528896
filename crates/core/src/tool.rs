//! Tool trait — the abstraction over capabilities the model may invoke.
//!
//! The model never calls a collaborator directly. It names a declared tool
//! and supplies raw argument text; that text is validated here before any
//! tool sees it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;

/// A tool call as surfaced by the completion endpoint, arguments still raw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments exactly as the model produced them
    pub raw_arguments: String,
}

impl ToolInvocationRequest {
    /// Parse the raw argument text into structured JSON.
    ///
    /// Malformed text is an error, never silently replaced by `{}`.
    pub fn parse_arguments(&self) -> Result<serde_json::Value, ToolError> {
        serde_json::from_str(&self.raw_arguments).map_err(|e| ToolError::InvalidArguments {
            tool_name: self.name.clone(),
            reason: format!("arguments are not valid JSON: {e}"),
        })
    }
}

impl From<&MessageToolCall> for ToolInvocationRequest {
    fn from(call: &MessageToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            raw_arguments: call.arguments.clone(),
        }
    }
}

/// The result of one tool dispatch, ready for re-injection into a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Which tool produced it
    pub tool_name: String,

    /// Whether a declared tool actually ran
    pub success: bool,

    /// The structured result
    pub data: serde_json::Value,

    /// `data` serialized to JSON and cut to the result ceiling
    pub output: String,
}

/// Attribution of a tool that ran during a turn, returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTool {
    pub name: String,
    pub result: serde_json::Value,
}

/// The core Tool trait.
///
/// Each capability (inbox retrieval, sending, contacts) implements this
/// trait and is registered in a `ToolRegistry`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "retrieve-inbox").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with already-parsed arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// An ordered registry of tools.
///
/// Declaration order is preserved so the catalog sent to the model is
/// identical on every call.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
