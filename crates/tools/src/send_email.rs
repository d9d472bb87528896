//! `send-email` — deliver a message through the transmission collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use mailpilot_core::error::ToolError;
use mailpilot_core::mail::{MailTransmission, OutgoingMail};
use mailpilot_core::tool::Tool;
use serde::Deserialize;
use tracing::info;

pub const NAME: &str = "send-email";

#[derive(Debug, Deserialize)]
struct SendEmailArgs {
    to: String,
    subject: String,
    body: String,
}

pub struct SendEmailTool {
    mailer: Arc<dyn MailTransmission>,
}

impl SendEmailTool {
    pub fn new(mailer: Arc<dyn MailTransmission>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Sends an email to the specified recipient with the given subject and body."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "Recipient email address"
                },
                "subject": {
                    "type": "string",
                    "description": "Email subject line"
                },
                "body": {
                    "type": "string",
                    "description": "Email body text"
                }
            },
            "required": ["to", "subject", "body"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: SendEmailArgs =
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;
        if args.to.trim().is_empty() {
            return Err(ToolError::InvalidArguments {
                tool_name: NAME.into(),
                reason: "recipient is empty".into(),
            });
        }

        let to = args.to.trim().to_string();
        self.mailer
            .send(OutgoingMail::new(to.clone(), args.subject, args.body))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;
        info!(to = %to, "Email sent on behalf of the model");

        Ok(serde_json::json!({
            "success": true,
            "message": "Email sent successfully"
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailpilot_core::error::MailError;
    use mailpilot_mail::InMemoryMailbox;

    #[tokio::test]
    async fn sends_and_reports_success() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let tool = SendEmailTool::new(mailbox.clone());
        let result = tool
            .execute(serde_json::json!({"to": "bob@x.com", "subject": "Hi", "body": "hi"}))
            .await
            .unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["message"], "Email sent successfully");

        let sent = mailbox.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "bob@x.com");
        assert_eq!(sent[0].body, "hi");
    }

    #[tokio::test]
    async fn missing_field_is_invalid() {
        let tool = SendEmailTool::new(Arc::new(InMemoryMailbox::new()));
        let err = tool
            .execute(serde_json::json!({"to": "bob@x.com", "subject": "Hi"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn blank_recipient_is_invalid() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let tool = SendEmailTool::new(mailbox.clone());
        let err = tool
            .execute(serde_json::json!({"to": "  ", "subject": "Hi", "body": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(mailbox.sent().await.is_empty());
    }

    #[tokio::test]
    async fn transmission_failure_propagates() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox
            .set_failure(Some(MailError::SendFailed("550 rejected".into())))
            .await;
        let tool = SendEmailTool::new(mailbox);
        let err = tool
            .execute(serde_json::json!({"to": "bob@x.com", "subject": "Hi", "body": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { ref reason, .. } if reason.contains("550")));
    }
}
