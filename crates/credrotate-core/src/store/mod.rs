//! Persistent storage of the rotated secret.
//!
//! The secret lives as a single row of a generic key-value configuration
//! table. [`SecretStore`] is the seam the orchestrator talks to;
//! [`ConfigurationTable`] is the SQLite-backed implementation.

mod sqlite;

pub use sqlite::{ConfigurationTable, DEFAULT_TABLE};

use secrecy::SecretString;

use crate::error::Result;

/// Read/write access to the stored secret.
pub trait SecretStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `RotationError::NotFound` if no row exists for `key`, or
    /// `RotationError::Store` if the query fails.
    fn read(&mut self, key: &str) -> Result<SecretString>;

    /// Overwrite the value stored under `key`.
    ///
    /// The change is committed before this returns. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns `RotationError::Store` on any database failure, including an
    /// update that matched no row.
    fn write(&mut self, key: &str, value: &SecretString) -> Result<()>;
}
