//! Mail collaborators for mailpilot.
//!
//! Implements the `MailRetrieval` and `MailTransmission` traits from
//! `mailpilot-core`:
//! - [`ImapMailbox`]: one TLS IMAP session, reconnected on demand
//! - [`SmtpMailer`]: SMTP delivery (STARTTLS, or implicit TLS on port 465)
//! - [`InMemoryMailbox`]: both traits over a Vec, for tests and offline runs

pub mod imap;
pub mod in_memory;
pub mod smtp;

pub use imap::ImapMailbox;
pub use in_memory::InMemoryMailbox;
pub use smtp::SmtpMailer;
