//! Outgoing mail.
//!
//! The service only needs "send this message to these recipients"; the
//! transport behind it is pluggable through [`Mailer`].

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Error types for mail delivery
#[derive(Error, Debug)]
pub enum MailError {
    /// No recipient with a usable address
    #[error("No recipients given")]
    NoRecipients,

    /// Neither the caller nor the mailer supplied a sender
    #[error("No sender address configured")]
    NoSender,

    /// Transport specific failure
    #[error("Mail transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync + Debug {
    /// Sends one message. `from_email` falls back to the mailer's default sender.
    async fn send_mail(
        &self,
        subject: &str,
        message: &str,
        from_email: Option<&str>,
        recipients: &[String],
    ) -> Result<(), MailError>;
}

/// A message as handed to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub subject: String,
    pub message: String,
    pub from_email: String,
    pub recipients: Vec<String>,
}

fn prepare(
    default_from: &str,
    subject: &str,
    message: &str,
    from_email: Option<&str>,
    recipients: &[String],
) -> Result<SentMail, MailError> {
    let recipients: Vec<String> = recipients
        .iter()
        .filter(|r| !r.trim().is_empty())
        .cloned()
        .collect();
    if recipients.is_empty() {
        return Err(MailError::NoRecipients);
    }

    let from_email = from_email.unwrap_or(default_from);
    if from_email.is_empty() {
        return Err(MailError::NoSender);
    }

    Ok(SentMail {
        subject: subject.to_string(),
        message: message.to_string(),
        from_email: from_email.to_string(),
        recipients,
    })
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogMailer {
    default_from: String,
}

impl LogMailer {
    pub fn new(default_from: impl Into<String>) -> Self {
        Self {
            default_from: default_from.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    #[instrument(skip(self, message))]
    async fn send_mail(
        &self,
        subject: &str,
        message: &str,
        from_email: Option<&str>,
        recipients: &[String],
    ) -> Result<(), MailError> {
        let mail = prepare(&self.default_from, subject, message, from_email, recipients)?;
        info!(
            from = %mail.from_email,
            to = %mail.recipients.join(", "),
            "Mail: {}",
            mail.subject
        );
        debug!("Mail body:\n{}", mail.message);
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests and local development.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    default_from: String,
    outbox: Mutex<Vec<SentMail>>,
}

impl MemoryMailer {
    pub fn new(default_from: impl Into<String>) -> Self {
        Self {
            default_from: default_from.into(),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Messages sent so far, oldest first.
    pub fn outbox(&self) -> Vec<SentMail> {
        match self.outbox.lock() {
            Ok(outbox) => outbox.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_mail(
        &self,
        subject: &str,
        message: &str,
        from_email: Option<&str>,
        recipients: &[String],
    ) -> Result<(), MailError> {
        let mail = prepare(&self.default_from, subject, message, from_email, recipients)?;
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        outbox.push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::new("hub@example.com");
        mailer
            .send_mail("Hello", "Body", None, &["jane@example.com".to_string()])
            .await
            .unwrap();

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].from_email, "hub@example.com");
        assert_eq!(outbox[0].recipients, vec!["jane@example.com".to_string()]);
    }

    #[tokio::test]
    async fn blank_recipient_is_rejected() {
        let mailer = MemoryMailer::new("hub@example.com");
        let result = mailer.send_mail("Hello", "Body", None, &[String::new()]).await;
        assert!(matches!(result, Err(MailError::NoRecipients)));
        assert!(mailer.outbox().is_empty());
    }

    #[tokio::test]
    async fn explicit_sender_wins() {
        let mailer = MemoryMailer::new("");
        let result = mailer
            .send_mail("Hello", "Body", None, &["jane@example.com".to_string()])
            .await;
        assert!(matches!(result, Err(MailError::NoSender)));

        mailer
            .send_mail("Hello", "Body", Some("admin@example.com"), &["jane@example.com".to_string()])
            .await
            .unwrap();
        assert_eq!(mailer.outbox()[0].from_email, "admin@example.com");
    }
}
