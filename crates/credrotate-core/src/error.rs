//! Error types for credential rotation.
//!
//! Each component fails with its own kind so the orchestrator can report
//! exactly which step of a rotation went wrong. The CLI layer maps these to
//! exit codes and notification bodies.

use thiserror::Error;

/// Result type alias for rotation operations.
pub type Result<T> = std::result::Result<T, RotationError>;

/// Core error type for rotation operations.
#[derive(Debug, Error)]
pub enum RotationError {
    /// Secret row missing from the configuration table
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database read/write failure
    #[error("Store error: {0}")]
    Store(String),

    /// Stored password rejected by the operating system
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Unexpected response or timeout during the password change session
    #[error("Password change error: {0}")]
    Change(String),

    /// Session failed after the new password was confirmed to the program,
    /// so the system may already be using it
    #[error("Password change unconfirmed: {0}")]
    UnconfirmedChange(String),

    /// Job table backup or install failure
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Notification could not be delivered
    #[error("Notification error: {0}")]
    Notify(String),

    /// The system random source failed
    #[error("Entropy error: {0}")]
    Entropy(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RotationError {
    /// Name of the error kind as it appears in failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RotationError::NotFound(_) => "NotFoundError",
            RotationError::Store(_) => "StoreError",
            RotationError::InvalidCredential(_) => "InvalidCredentialError",
            RotationError::Change(_) => "ChangeError",
            RotationError::UnconfirmedChange(_) => "UnconfirmedChangeError",
            RotationError::Schedule(_) => "ScheduleError",
            RotationError::Notify(_) => "NotifyError",
            RotationError::Entropy(_) => "EntropyError",
            RotationError::InvalidInput(_) => "InvalidInputError",
        }
    }
}

impl From<rusqlite::Error> for RotationError {
    fn from(err: rusqlite::Error) -> Self {
        RotationError::Store(format!("SQLite error: {}", err))
    }
}

impl From<std::io::Error> for RotationError {
    fn from(err: std::io::Error) -> Self {
        RotationError::Schedule(err.to_string())
    }
}
