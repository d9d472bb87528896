//! IMAP mail retrieval.
//!
//! Holds a single authenticated session behind an async mutex, so at most
//! one command is in flight against the mailbox at a time. The session is
//! opened lazily on first use and discarded after any protocol error; the
//! next call reconnects.

use async_imap::Session;
use async_imap::types::{Fetch, Flag};
use async_native_tls::{TlsConnector, TlsStream};
use async_std::net::TcpStream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mail_parser::{Address, MessageParser, PartType};
use mailpilot_config::ImapConfig;
use mailpilot_core::error::MailError;
use mailpilot_core::mail::{MailRetrieval, RawMail};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type ImapSession = Session<TlsStream<TcpStream>>;

/// Mail retrieval over IMAP with TLS.
pub struct ImapMailbox {
    host: String,
    port: u16,
    username: String,
    password: String,
    mailbox: String,
    session: Mutex<Option<ImapSession>>,
}

impl ImapMailbox {
    pub fn new(config: &ImapConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone().unwrap_or_default(),
            mailbox: config.mailbox.clone(),
            session: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<ImapSession, MailError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| MailError::Connection(format!("{}:{}: {e}", self.host, self.port)))?;
        let tls = TlsConnector::new();
        let tls_stream = tls
            .connect(self.host.as_str(), tcp)
            .await
            .map_err(|e| MailError::Connection(format!("TLS handshake with {}: {e}", self.host)))?;

        let client = async_imap::Client::new(tls_stream);
        let session = client
            .login(&self.username, &self.password)
            .await
            .map_err(|e| MailError::Authentication(e.0.to_string()))?;

        info!(host = %self.host, port = self.port, "Connected to IMAP server");
        Ok(session)
    }

    /// Make sure `slot` holds a live session and hand it out.
    async fn ensure_session<'a>(
        &self,
        slot: &'a mut Option<ImapSession>,
    ) -> Result<&'a mut ImapSession, MailError> {
        if slot.is_none() {
            *slot = Some(self.connect().await?);
        }
        slot.as_mut()
            .ok_or_else(|| MailError::Connection("IMAP client not connected".into()))
    }

    async fn fetch_newest(
        session: &mut ImapSession,
        mailbox: &str,
        limit: usize,
    ) -> Result<Vec<RawMail>, MailError> {
        session.select(mailbox).await.map_err(protocol)?;

        let mut uids: Vec<u32> = session
            .uid_search("ALL")
            .await
            .map_err(protocol)?
            .into_iter()
            .collect();
        // Higher UID = newer
        uids.sort_unstable_by(|a, b| b.cmp(a));
        uids.truncate(limit);
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let uid_set = uids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let fetches: Vec<Fetch> = session
            .uid_fetch(&uid_set, "(UID FLAGS BODY.PEEK[])")
            .await
            .map_err(protocol)?
            .try_collect()
            .await
            .map_err(protocol)?;

        let mut mails: Vec<RawMail> = fetches.iter().filter_map(fetch_to_mail).collect();
        mails.sort_by(|a, b| b.date.cmp(&a.date));
        debug!(requested = limit, fetched = mails.len(), "Fetched inbox");
        Ok(mails)
    }
}

#[async_trait]
impl MailRetrieval for ImapMailbox {
    async fn fetch_inbox(&self, limit: usize) -> Result<Vec<RawMail>, MailError> {
        let mut slot = self.session.lock().await;
        let session = self.ensure_session(&mut slot).await?;
        let result = Self::fetch_newest(session, &self.mailbox, limit).await;
        if result.is_err() {
            // Force a fresh login next time
            *slot = None;
        }
        result
    }

    async fn unread_count(&self) -> Result<usize, MailError> {
        let mut slot = self.session.lock().await;
        let session = self.ensure_session(&mut slot).await?;
        let result = async {
            session.select(&self.mailbox).await.map_err(protocol)?;
            let unseen = session.search("UNSEEN").await.map_err(protocol)?;
            Ok::<_, MailError>(unseen.len())
        }
        .await;
        if result.is_err() {
            *slot = None;
        }
        result
    }
}

fn protocol(e: async_imap::error::Error) -> MailError {
    MailError::Protocol(e.to_string())
}

fn fetch_to_mail(fetch: &Fetch) -> Option<RawMail> {
    let id = fetch.uid.unwrap_or(fetch.message).to_string();
    let Some(source) = fetch.body() else {
        warn!(id = %id, "Fetched message has no body, skipping");
        return None;
    };
    let seen = fetch.flags().any(|flag| matches!(flag, Flag::Seen));
    let mail = parse_message(&id, source, seen);
    if mail.is_none() {
        warn!(id = %id, "Error parsing message, skipping");
    }
    mail
}

/// Parse a full RFC 5322 source into a raw mailbox record.
pub(crate) fn parse_message(id: &str, source: &[u8], seen: bool) -> Option<RawMail> {
    let message = MessageParser::default().parse(source)?;

    let from = message
        .from()
        .and_then(display_first)
        .unwrap_or_else(|| "Unknown".to_string());
    let to = message
        .to()
        .map(|addresses| {
            addresses
                .iter()
                .filter_map(|addr| addr.address().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    // Only a genuine text/plain part counts as text; HTML-only messages keep
    // `text` empty so reducers can fall back to the HTML.
    let text = message
        .text_bodies()
        .next()
        .and_then(|part| match &part.body {
            PartType::Text(text) => Some(text.to_string()),
            _ => None,
        })
        .unwrap_or_default();
    let html = message
        .body_html(0)
        .map(|html| html.into_owned())
        .unwrap_or_default();

    let date = message
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or_else(Utc::now);

    Some(RawMail {
        id: id.to_string(),
        from,
        to,
        subject: message.subject().unwrap_or("(No Subject)").to_string(),
        text,
        html,
        date,
        unread: !seen,
    })
}

/// `Name <address>` when both are known, otherwise whichever is present.
fn display_first(address: &Address<'_>) -> Option<String> {
    let addr = address.first()?;
    match (addr.name(), addr.address()) {
        (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
        (None, Some(email)) => Some(email.to_string()),
        (Some(name), None) => Some(name.to_string()),
        (None, None) => None,
    }
}
