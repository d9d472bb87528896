//! SMTP mail transmission via lettre.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mailpilot_config::SmtpConfig;
use mailpilot_core::error::MailError;
use mailpilot_core::mail::{MailTransmission, OutgoingMail};
use tracing::{info, warn};

/// Sends mail through an authenticated SMTP relay.
///
/// Port 465 uses implicit TLS; every other port negotiates STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Connection(format!("SMTP relay {}: {e}", config.host)))?;

        let mut builder = builder.port(config.port);
        if let Some(password) = &config.password {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            sender: config.sender().to_string(),
        })
    }

    /// Build the multipart/alternative message for `mail`.
    pub(crate) fn build_message(sender: &str, mail: &OutgoingMail) -> Result<Message, MailError> {
        let from: Mailbox = sender
            .parse()
            .map_err(|e| MailError::InvalidMessage(format!("invalid sender '{sender}': {e}")))?;
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| MailError::InvalidMessage(format!("invalid recipient '{}': {e}", mail.to)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                mail.body.clone(),
                mail.html_body(),
            ))
            .map_err(|e| MailError::InvalidMessage(e.to_string()))
    }
}

#[async_trait]
impl MailTransmission for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Self::build_message(&self.sender, &mail)?;
        match self.transport.send(message).await {
            Ok(response) => {
                info!(to = %mail.to, code = %response.code(), "Email sent");
                Ok(())
            }
            Err(e) => {
                warn!(to = %mail.to, error = %e, "SMTP send failed");
                Err(MailError::SendFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn builds_alternative_message() {
        let mail = OutgoingMail::new("bob@example.com", "Lunch", "Noon?\nSee you");
        let message = SmtpMailer::build_message("me@example.com", &mail).unwrap();
        let raw = formatted(&message);
        assert!(raw.contains("To: bob@example.com"));
        assert!(raw.contains("Subject: Lunch"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Noon?<br>See you"));
    }

    #[test]
    fn invalid_recipient_rejected() {
        let mail = OutgoingMail::new("not an address", "x", "y");
        let err = SmtpMailer::build_message("me@example.com", &mail).unwrap_err();
        assert!(matches!(err, MailError::InvalidMessage(_)));
    }

    #[test]
    fn missing_sender_rejected() {
        let mail = OutgoingMail::new("bob@example.com", "x", "y");
        let err = SmtpMailer::build_message("", &mail).unwrap_err();
        assert!(matches!(err, MailError::InvalidMessage(_)));
    }

    #[test]
    fn builds_transport_without_network() {
        let mut config = SmtpConfig::default();
        config.username = "me@example.com".into();
        config.password = Some("app-password".into());
        let mailer = SmtpMailer::new(&config).unwrap();
        assert_eq!(mailer.sender, "me@example.com");
    }
}
