//! CLI error types for structured error handling.
//!
//! Typed errors map the end state of a run to a specific exit code, so
//! cron (and whoever reads its mail) can tell the outcomes apart.

use std::fmt;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// The rotation failed; the failure was reported by email.
    RotationFailed { state: String, kind: String },

    /// The outcome could not be emailed.
    NotifyFailed { message: String, rotated: bool },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::RotationFailed { state, kind } => {
                write!(
                    f,
                    "Rotation failed in state {} ({}); failure notification sent",
                    state, kind
                )
            }
            CliError::NotifyFailed { message, rotated } => {
                let outcome = if *rotated { "succeeded" } else { "failed" };
                write!(
                    f,
                    "Rotation {} but the notification could not be sent: {}",
                    outcome, message
                )
            }
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn rotation_failed(state: impl Into<String>, kind: impl Into<String>) -> Self {
        CliError::RotationFailed {
            state: state.into(),
            kind: kind.into(),
        }
    }

    pub fn notify_failed(message: impl Into<String>, rotated: bool) -> Self {
        CliError::NotifyFailed {
            message: message.into(),
            rotated,
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        use super::constants::exit_codes;
        match self {
            CliError::RotationFailed { .. } => exit_codes::ROTATION_FAILED,
            CliError::NotifyFailed { .. } => exit_codes::NOTIFY_FAILED,
        }
    }

    /// Print error message to stderr and exit with appropriate code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        std::process::exit(self.exit_code())
    }
}
