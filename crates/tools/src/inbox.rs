//! `retrieve-inbox` — fetch the newest inbox entries, reduced for a prompt.

use std::sync::Arc;

use async_trait::async_trait;
use mailpilot_core::error::ToolError;
use mailpilot_core::mail::MailRetrieval;
use mailpilot_core::tool::Tool;
use serde::Deserialize;
use tracing::debug;

use crate::reducer::{EmailPayloadReducer, MAX_EMAILS};

pub const NAME: &str = "retrieve-inbox";

#[derive(Debug, Default, Deserialize)]
struct InboxArgs {
    /// Models send integers, floats and occasionally nothing at all.
    #[serde(default)]
    limit: Option<f64>,
}

impl InboxArgs {
    /// Missing, zero or negative means the default; anything else is
    /// capped at [`MAX_EMAILS`].
    fn effective_limit(&self) -> usize {
        match self.limit {
            Some(limit) if limit >= 1.0 => (limit.floor() as usize).min(MAX_EMAILS),
            _ => MAX_EMAILS,
        }
    }
}

pub struct RetrieveInboxTool {
    mailbox: Arc<dyn MailRetrieval>,
    reducer: EmailPayloadReducer,
}

impl RetrieveInboxTool {
    pub fn new(mailbox: Arc<dyn MailRetrieval>) -> Self {
        Self {
            mailbox,
            reducer: EmailPayloadReducer::default(),
        }
    }
}

#[async_trait]
impl Tool for RetrieveInboxTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Fetches the user's real inbox emails. Returns list of emails with details like sender, subject, content, date, and unread status."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "number",
                    "description": "Maximum number of emails to fetch (default: 20, max: 20)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: InboxArgs = if arguments.is_null() {
            InboxArgs::default()
        } else {
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?
        };
        let limit = args.effective_limit();

        let mails = self
            .mailbox
            .fetch_inbox(limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;
        debug!(limit, fetched = mails.len(), "Reducing inbox for prompt");

        let inbox = self.reducer.reduce(&mails, limit);
        serde_json::to_value(&inbox).map_err(|e| ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })
    }
}
