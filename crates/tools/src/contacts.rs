//! `list-contacts` — distinct senders seen in the recent inbox.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use mailpilot_core::error::ToolError;
use mailpilot_core::mail::MailRetrieval;
use mailpilot_core::tool::Tool;

pub const NAME: &str = "list-contacts";

/// How many inbox entries are scanned for senders.
pub const SCAN_LIMIT: usize = 50;

/// Most contacts ever returned.
pub const MAX_CONTACTS: usize = 100;

pub struct ListContactsTool {
    mailbox: Arc<dyn MailRetrieval>,
}

impl ListContactsTool {
    pub fn new(mailbox: Arc<dyn MailRetrieval>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for ListContactsTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Extracts unique email contacts (senders) from the inbox."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let mails = self
            .mailbox
            .fetch_inbox(SCAN_LIMIT)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;

        let mut seen = HashSet::new();
        let contacts: Vec<String> = mails
            .into_iter()
            .map(|mail| mail.from)
            .filter(|from| !from.trim().is_empty())
            .filter(|from| seen.insert(from.clone()))
            .take(MAX_CONTACTS)
            .collect();

        Ok(serde_json::json!({
            "count": contacts.len(),
            "contacts": contacts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailpilot_core::mail::RawMail;
    use mailpilot_mail::InMemoryMailbox;

    #[tokio::test]
    async fn distinct_non_empty_senders_in_order() {
        let now = chrono::Utc::now();
        let mailbox = InMemoryMailbox::with_mails(vec![
            RawMail::new("1", "Alice <alice@x.com>", "a").with_date(now),
            RawMail::new("2", "", "b").with_date(now - chrono::Duration::minutes(1)),
            RawMail::new("3", "Bob <bob@x.com>", "c").with_date(now - chrono::Duration::minutes(2)),
            RawMail::new("4", "Alice <alice@x.com>", "d").with_date(now - chrono::Duration::minutes(3)),
        ]);
        let tool = ListContactsTool::new(Arc::new(mailbox));
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(
            result["contacts"],
            serde_json::json!(["Alice <alice@x.com>", "Bob <bob@x.com>"])
        );
    }

    #[tokio::test]
    async fn scans_at_most_fifty_entries() {
        let mailbox = InMemoryMailbox::with_mails(
            (0..80)
                .map(|i| RawMail::new(i.to_string(), format!("user{i}@x.com"), "s"))
                .collect(),
        );
        let tool = ListContactsTool::new(Arc::new(mailbox));
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(result["count"], SCAN_LIMIT);
    }
}
