//! In-process mailbox for tests, demos and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mailpilot_core::error::MailError;
use mailpilot_core::mail::{MailRetrieval, MailTransmission, OutgoingMail, RawMail};
use tokio::sync::RwLock;

/// A mailbox held in memory that records everything sent through it.
#[derive(Default)]
pub struct InMemoryMailbox {
    mails: RwLock<Vec<RawMail>>,
    sent: RwLock<Vec<OutgoingMail>>,
    failure: RwLock<Option<MailError>>,
    fetch_calls: AtomicUsize,
}

impl InMemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mails(mails: Vec<RawMail>) -> Self {
        Self {
            mails: RwLock::new(mails),
            ..Self::default()
        }
    }

    pub async fn push(&self, mail: RawMail) {
        self.mails.write().await.push(mail);
    }

    /// Everything passed to `send`, oldest first.
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.read().await.clone()
    }

    /// Make every subsequent call fail with `error`; `None` clears it.
    pub async fn set_failure(&self, error: Option<MailError>) {
        *self.failure.write().await = error;
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn check_failure(&self) -> Result<(), MailError> {
        match self.failure.read().await.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MailRetrieval for InMemoryMailbox {
    async fn fetch_inbox(&self, limit: usize) -> Result<Vec<RawMail>, MailError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;
        let mut mails = self.mails.read().await.clone();
        mails.sort_by(|a, b| b.date.cmp(&a.date));
        mails.truncate(limit);
        Ok(mails)
    }

    async fn unread_count(&self) -> Result<usize, MailError> {
        self.check_failure().await?;
        Ok(self.mails.read().await.iter().filter(|m| m.unread).count())
    }
}

#[async_trait]
impl MailTransmission for InMemoryMailbox {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        self.check_failure().await?;
        self.sent.write().await.push(mail);
        Ok(())
    }
}
