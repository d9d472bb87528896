//! Tools the model may invoke on the user's mailbox.
//!
//! The catalog is fixed: [`default_registry`] declares exactly three tools
//! in a stable order, and nothing outside it can be invoked. The
//! [`ToolExecutor`] dispatches a single request against that catalog and
//! bounds the size of what comes back.

pub mod contacts;
pub mod executor;
pub mod inbox;
pub mod reducer;
pub mod send_email;

use std::sync::Arc;

use mailpilot_core::mail::{MailRetrieval, MailTransmission};
use mailpilot_core::tool::ToolRegistry;

pub use contacts::ListContactsTool;
pub use executor::{DEFAULT_RESULT_MAX_CHARS, TRUNCATION_MARKER, ToolExecutor, truncate_result};
pub use inbox::RetrieveInboxTool;
pub use reducer::{EmailPayloadReducer, ReducedInbox, ReducedMail};
pub use send_email::SendEmailTool;

/// Build the catalog: `retrieve-inbox`, `send-email`, `list-contacts`.
pub fn default_registry(
    retrieval: Arc<dyn MailRetrieval>,
    transmission: Arc<dyn MailTransmission>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(RetrieveInboxTool::new(retrieval.clone())));
    registry.register(Box::new(SendEmailTool::new(transmission)));
    registry.register(Box::new(ListContactsTool::new(retrieval)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailpilot_mail::InMemoryMailbox;

    #[test]
    fn catalog_is_fixed_and_ordered() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let registry = default_registry(mailbox.clone(), mailbox);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["retrieve-inbox", "send-email", "list-contacts"]);
    }

    #[test]
    fn send_email_requires_all_fields() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let registry = default_registry(mailbox.clone(), mailbox);
        let schema = registry.get("send-email").unwrap().parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["to", "subject", "body"]));
        let contacts = registry.get("list-contacts").unwrap().parameters_schema();
        assert!(contacts["properties"].as_object().unwrap().is_empty());
    }

    #[test]
    fn catalog_is_identical_across_builds() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let a = default_registry(mailbox.clone(), mailbox.clone()).definitions();
        let b = default_registry(mailbox.clone(), mailbox).definitions();
        assert_eq!(a, b);
    }
}
