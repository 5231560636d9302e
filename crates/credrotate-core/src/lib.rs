//! # Credrotate Core
//!
//! Core library for credrotate - scheduled rotation of a shared service
//! account password.
//!
//! A rotation reads the stored password, changes the operating-system
//! account password through an interactive `passwd` session, persists the
//! new password, reschedules the next run in the user's crontab, and
//! reports the outcome to a notifier.
//!
//! ## Architecture
//!
//! - **password**: candidate password generation policy
//! - **store**: key-value configuration table holding the secret
//! - **changer**: prompt-driven password change protocol
//! - **schedule**: next-run computation and crontab maintenance
//! - **notify**: outcome notification interface
//! - **orchestrator**: the rotation state machine tying it all together

pub mod changer;
pub mod error;
pub mod fs;
pub mod notify;
pub mod orchestrator;
pub mod password;
pub mod schedule;
pub mod store;

pub use changer::CredentialChanger;
pub use error::{Result, RotationError};
pub use notify::{Notification, Notifier};
pub use orchestrator::{
    RotationOrchestrator, RotationOutcome, RotationReport, RotationSettings, RotationState,
};
pub use schedule::Scheduler;
pub use store::SecretStore;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
