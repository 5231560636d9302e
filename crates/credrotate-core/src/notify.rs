//! Outcome notification interface.
//!
//! The transport lives outside the core; the orchestrator only builds the
//! [`Notification`] and hands it to a [`Notifier`] once.

use crate::error::Result;

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivers a notification.
pub trait Notifier {
    fn send(&self, notification: &Notification) -> Result<()>;
}

/// Status word used in the subject line.
pub fn status_word(success: bool) -> &'static str {
    if success {
        "Successful"
    } else {
        "Failure"
    }
}

/// Subject line `"<system> - Auto-credential <status>"`.
pub fn subject(system: &str, success: bool) -> String {
    format!("{} - Auto-credential {}", system, status_word(success))
}
