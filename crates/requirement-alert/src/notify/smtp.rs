use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use tracing::info;

use super::{Notifier, NotifyError, OutboundEmail};
use crate::config::MailConfig;

const IMPLICIT_TLS_PORT: u16 = 465;

/// Blocking SMTP client authenticated with the configured mail account.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: SmtpTransport,
    sender: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let address: Address = config
            .username
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(config.username.clone()))?;
        let sender = Mailbox::new(Some(config.sender_name.clone()), address);

        let builder = (if config.smtp_port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&config.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&config.smtp_host)
        })
        .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, sender })
    }

    /// Open a connection and authenticate without sending anything.
    pub fn verify(&self) -> Result<(), NotifyError> {
        match self.transport.test_connection() {
            Ok(true) => Ok(()),
            Ok(false) => Err(NotifyError::Transport(
                "server rejected connection test".to_string(),
            )),
            Err(err) => Err(NotifyError::Transport(err.to_string())),
        }
    }

    pub fn sender(&self) -> &Mailbox {
        &self.sender
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, NotifyError> {
        let to: Address = email
            .to
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(email.to.clone()))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(Mailbox::new(None, to))
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())?;
        Ok(message)
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, email: &OutboundEmail) -> Result<(), NotifyError> {
        let message = self.build_message(email)?;
        self.transport
            .send(&message)
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config(port: u16) -> MailConfig {
        MailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: port,
            username: "alerts@example.com".to_string(),
            password: "secret".to_string(),
            sender_name: "Requirement Alert".to_string(),
        }
    }

    fn email(to: &str) -> OutboundEmail {
        OutboundEmail {
            to: to.to_string(),
            subject: "New Product Requirement".to_string(),
            html_body: "<h3>New Requirement Received</h3>".to_string(),
        }
    }

    #[test]
    fn sender_uses_display_name_and_account() {
        let notifier = SmtpNotifier::new(&mail_config(465)).expect("notifier builds");
        let sender = notifier.sender().to_string();
        assert!(sender.contains("Requirement Alert"));
        assert!(sender.ends_with("<alerts@example.com>"));
    }

    #[test]
    fn rejects_unparseable_account() {
        let mut config = mail_config(587);
        config.username = "not-an-address".to_string();
        assert!(matches!(
            SmtpNotifier::new(&config),
            Err(NotifyError::InvalidAddress(raw)) if raw == "not-an-address"
        ));
    }

    #[test]
    fn message_build_rejects_bad_recipient() {
        let notifier = SmtpNotifier::new(&mail_config(587)).expect("notifier builds");
        assert!(matches!(
            notifier.build_message(&email("nobody")),
            Err(NotifyError::InvalidAddress(raw)) if raw == "nobody"
        ));
    }

    #[test]
    fn message_carries_subject_and_html() {
        let notifier = SmtpNotifier::new(&mail_config(465)).expect("notifier builds");
        let message = notifier
            .build_message(&email("doc@example.com"))
            .expect("message builds");
        let raw = String::from_utf8(message.formatted()).expect("utf8 message");
        assert!(raw.contains("Subject: New Product Requirement"));
        assert!(raw.contains("To: doc@example.com"));
        assert!(raw.contains("Content-Type: text/html"));
    }
}
