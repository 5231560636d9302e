//! Transport for prompt-driven programs.

use crate::error::Result;

/// A running conversation with a line-oriented, prompt-driven program.
pub trait PromptSession {
    /// Block until the program prints one of `patterns`.
    ///
    /// Returns the index of the pattern that matched. Output that never
    /// matches within the session's wait bound, or end of output, is a
    /// `RotationError::Change`.
    fn expect_any(&mut self, patterns: &[&str]) -> Result<usize>;

    /// Send `line` followed by a newline.
    fn send_line(&mut self, line: &str) -> Result<()>;
}

/// Starts a fresh session for each password change.
pub trait SessionSpawner {
    fn spawn(&mut self) -> Result<Box<dyn PromptSession>>;
}

#[cfg(unix)]
pub use pty::{PtySession, PtySpawner};

#[cfg(unix)]
mod pty {
    use std::time::Duration;

    use rexpect::ReadUntil;
    use tracing::debug;

    use super::{PromptSession, SessionSpawner};
    use crate::error::{Result, RotationError};

    /// Spawns the password-change program inside a pseudo-terminal.
    #[derive(Debug, Clone)]
    pub struct PtySpawner {
        program: String,
        timeout: Duration,
    }

    impl PtySpawner {
        /// `timeout` bounds the wait for each expected prompt.
        pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
            Self {
                program: program.into(),
                timeout,
            }
        }
    }

    impl SessionSpawner for PtySpawner {
        fn spawn(&mut self) -> Result<Box<dyn PromptSession>> {
            let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            let inner = rexpect::spawn(&self.program, Some(timeout_ms)).map_err(|e| {
                RotationError::Change(format!("Failed to start '{}': {}", self.program, e))
            })?;
            debug!(program = %self.program, timeout_ms, "spawned password change session");
            Ok(Box::new(PtySession {
                inner,
                program: self.program.clone(),
            }))
        }
    }

    /// Session backed by `rexpect`. The child is killed when dropped.
    pub struct PtySession {
        inner: rexpect::session::PtySession,
        program: String,
    }

    impl PromptSession for PtySession {
        fn expect_any(&mut self, patterns: &[&str]) -> Result<usize> {
            let needles = patterns
                .iter()
                .map(|pattern| ReadUntil::String((*pattern).to_string()))
                .collect();
            let (_, matched) = self.inner.exp_any(needles).map_err(|e| {
                RotationError::Change(format!(
                    "'{}' did not print any of {:?}: {}",
                    self.program, patterns, e
                ))
            })?;
            patterns
                .iter()
                .position(|pattern| *pattern == matched)
                .ok_or_else(|| {
                    RotationError::Change(format!(
                        "'{}' printed unrecognized text {:?}",
                        self.program, matched
                    ))
                })
        }

        fn send_line(&mut self, line: &str) -> Result<()> {
            self.inner.send_line(line).map(|_| ()).map_err(|e| {
                RotationError::Change(format!("Failed to write to '{}': {}", self.program, e))
            })
        }
    }
}
