//! Mail collaborator contracts.
//!
//! Retrieval and transmission are remote, possibly blocking services. The
//! orchestrator treats them as opaque shared handles and never calls them
//! concurrently within a turn.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MailError;

/// A mailbox entry as the retrieval service returns it: full, unreduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMail {
    pub id: String,
    /// Display form of the sender, e.g. `Bob <bob@example.com>`
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    /// Plain-text body, empty when the message only has HTML
    pub text: String,
    /// HTML body, empty when absent
    pub html: String,
    pub date: DateTime<Utc>,
    pub unread: bool,
}

impl RawMail {
    /// An unread, bodiless entry dated now.
    pub fn new(id: impl Into<String>, from: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: Vec::new(),
            subject: subject.into(),
            text: String::new(),
            html: String::new(),
            date: Utc::now(),
            unread: true,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn mark_read(mut self) -> Self {
        self.unread = false;
        self
    }
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Explicit HTML alternative; derived from `body` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            html: None,
        }
    }

    /// The HTML part to send: the explicit one, or the body with line breaks.
    pub fn html_body(&self) -> String {
        match &self.html {
            Some(html) => html.clone(),
            None => self.body.replace('\n', "<br>"),
        }
    }
}

/// The mail-retrieval collaborator.
#[async_trait]
pub trait MailRetrieval: Send + Sync {
    /// Fetch up to `limit` of the newest inbox entries, newest first.
    async fn fetch_inbox(&self, limit: usize) -> Result<Vec<RawMail>, MailError>;

    /// Number of unread entries in the inbox.
    async fn unread_count(&self) -> Result<usize, MailError>;
}

/// The mail-transmission collaborator.
#[async_trait]
pub trait MailTransmission: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}
