//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Rotation succeeded and the notification was sent
/// - 1: Usage or setup error (used by anyhow for unhandled errors)
/// - 2: Invalid arguments (reported by clap)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Usage printed because no arguments were given.
    pub const USAGE: i32 = 1;

    /// Rotation failed; the failure notification was sent.
    pub const ROTATION_FAILED: i32 = 3;

    /// The outcome notification could not be delivered.
    pub const NOTIFY_FAILED: i32 = 4;
}
