//! Email payload reducer — shrinks raw mailbox records before they reach
//! a prompt.
//!
//! Full HTML and untruncated bodies never leave this module; a reduced
//! record carries at most `max_text_chars` characters of cleaned text.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use mailpilot_core::mail::RawMail;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Absolute ceiling on records per reduction, whatever the caller asks for.
pub const MAX_EMAILS: usize = 20;

/// Default per-record text ceiling, in characters.
pub const MAX_TEXT_CHARS: usize = 500;

/// Appended to text that was cut.
pub const ELLIPSIS: &str = "...";

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag regex must compile"));

/// A size-bounded projection of a mailbox entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedMail {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: DateTime<Utc>,
    pub unread: bool,
    pub text: String,
}

/// The `retrieve-inbox` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedInbox {
    pub emails: Vec<ReducedMail>,
    /// Number of records in the source set
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct EmailPayloadReducer {
    max_emails: usize,
    max_text_chars: usize,
}

impl Default for EmailPayloadReducer {
    fn default() -> Self {
        Self {
            max_emails: MAX_EMAILS,
            max_text_chars: MAX_TEXT_CHARS,
        }
    }
}

impl EmailPayloadReducer {
    /// A reducer with tighter limits. `max_emails` is still clamped to
    /// [`MAX_EMAILS`].
    pub fn new(max_emails: usize, max_text_chars: usize) -> Self {
        Self {
            max_emails: max_emails.min(MAX_EMAILS),
            max_text_chars,
        }
    }

    /// Reduce `mails` to at most `min(requested, max_emails)` records, in
    /// source order.
    pub fn reduce(&self, mails: &[RawMail], requested: usize) -> ReducedInbox {
        let take = requested.min(self.max_emails);
        let emails: Vec<ReducedMail> = mails
            .iter()
            .take(take)
            .map(|mail| self.reduce_one(mail))
            .collect();

        let total = mails.len();
        let note = (total > emails.len())
            .then(|| format!("Showing {} of {} emails", emails.len(), total));

        ReducedInbox {
            emails,
            count: total,
            note,
        }
    }

    pub fn reduce_one(&self, mail: &RawMail) -> ReducedMail {
        ReducedMail {
            id: mail.id.clone(),
            from: mail.from.clone(),
            subject: mail.subject.clone(),
            date: mail.date,
            unread: mail.unread,
            text: truncate_chars(&collapse_whitespace(&body_text(mail)), self.max_text_chars),
        }
    }
}

/// Plain text when present, otherwise text recovered from the HTML body.
fn body_text(mail: &RawMail) -> String {
    if mail.text.is_empty() && !mail.html.is_empty() {
        strip_html(&mail.html)
    } else {
        mail.text.clone()
    }
}

/// Drop tags and decode the common entities.
///
/// `&amp;` is decoded after `&nbsp;` so `&amp;nbsp;` stays a literal.
pub fn strip_html(html: &str) -> String {
    HTML_TAG
        .replace_all(html, "")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
