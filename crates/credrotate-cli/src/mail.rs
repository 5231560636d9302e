//! SMTP delivery of rotation notifications.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};

use credrotate_core::{Notification, Notifier, Result, RotationError};

/// Sends notifications through an SMTP relay (plain, unauthenticated).
pub struct SmtpNotifier {
    mailer: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(host: &str, port: u16) -> Self {
        let mailer = SmtpTransport::builder_dangerous(host).port(port).build();
        Self { mailer }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        let message = build_message(notification)?;
        self.mailer
            .send(&message)
            .map_err(|e| RotationError::Notify(format!("SMTP delivery failed: {}", e)))?;
        Ok(())
    }
}

pub fn build_message(notification: &Notification) -> Result<Message> {
    if notification.recipients.is_empty() {
        return Err(RotationError::Notify("No recipients configured".to_string()));
    }

    let from: Mailbox = notification.sender.parse().map_err(|e| {
        RotationError::Notify(format!(
            "Invalid sender address '{}': {}",
            notification.sender, e
        ))
    })?;
    let mut builder = Message::builder()
        .from(from)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    for recipient in &notification.recipients {
        let to: Mailbox = recipient.parse().map_err(|e| {
            RotationError::Notify(format!("Invalid recipient address '{}': {}", recipient, e))
        })?;
        builder = builder.to(to);
    }

    builder
        .body(notification.body.clone())
        .map_err(|e| RotationError::Notify(format!("Failed to build email: {}", e)))
}
