//! Outbound e-mail boundary.

mod smtp;

pub use smtp::SmtpNotifier;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Transport used to deliver supplier notifications.
pub trait Notifier: Send + Sync {
    fn send(&self, email: &OutboundEmail) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid email address '{0}'")]
    InvalidAddress(String),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("mail transport failed: {0}")]
    Transport(String),
}
