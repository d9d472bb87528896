//! Tool executor — dispatches one validated invocation and bounds its
//! serialized result before it is re-injected into a prompt.

use mailpilot_core::error::ToolError;
use mailpilot_core::provider::ToolDefinition;
use mailpilot_core::tool::{ToolInvocationRequest, ToolRegistry, ToolResult};
use tracing::{info, warn};

/// Default ceiling on a serialized tool result, in characters.
pub const DEFAULT_RESULT_MAX_CHARS: usize = 50_000;

/// Appended to a result that was cut at the ceiling.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

pub struct ToolExecutor {
    registry: ToolRegistry,
    max_result_chars: usize,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            max_result_chars: DEFAULT_RESULT_MAX_CHARS,
        }
    }

    pub fn with_result_limit(mut self, max_chars: usize) -> Self {
        self.max_result_chars = max_chars;
        self
    }

    /// The catalog sent to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Parse the request's arguments and run the named tool.
    ///
    /// Malformed arguments and collaborator failures are errors. A name
    /// outside the catalog is not: it yields `{"error":"Unknown tool"}`
    /// with `success == false` so the turn can still be answered.
    pub async fn execute(&self, request: &ToolInvocationRequest) -> Result<ToolResult, ToolError> {
        let arguments = request.parse_arguments()?;

        let Some(tool) = self.registry.get(&request.name) else {
            warn!(tool = %request.name, "Model requested an unknown tool");
            return Ok(self.finish(request, false, serde_json::json!({"error": "Unknown tool"})));
        };

        info!(tool = %request.name, call_id = %request.id, "Executing tool");
        let data = tool.execute(arguments).await?;
        Ok(self.finish(request, true, data))
    }

    fn finish(
        &self,
        request: &ToolInvocationRequest,
        success: bool,
        data: serde_json::Value,
    ) -> ToolResult {
        let output = truncate_result(&data.to_string(), self.max_result_chars);
        ToolResult {
            call_id: request.id.clone(),
            tool_name: request.name.clone(),
            success,
            data,
            output,
        }
    }
}

/// Cut `serialized` to `max_chars` characters, marking the cut.
pub fn truncate_result(serialized: &str, max_chars: usize) -> String {
    match serialized.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            warn!(max_chars, "Tool result exceeds ceiling, truncating");
            format!("{}{TRUNCATION_MARKER}", &serialized[..cut])
        }
        None => serialized.to_string(),
    }
}
