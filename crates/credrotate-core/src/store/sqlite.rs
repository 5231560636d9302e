//! SQLite-backed key-value configuration table.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::SecretStore;
use crate::error::{Result, RotationError};

/// Table name used when none is configured.
pub const DEFAULT_TABLE: &str = "ordering_configuration";

/// Key-value configuration table (`key TEXT`, `value TEXT`).
///
/// Owns its connection for the lifetime of one invocation; the connection
/// is closed when the table handle is dropped, on every exit path.
pub struct ConfigurationTable {
    conn: Connection,
    table: String,
}

impl ConfigurationTable {
    const MAX_IDENTIFIER_BYTES: usize = 63;

    /// Open an existing database file.
    ///
    /// The file is never created: a missing database is an error rather than
    /// an empty table.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        if !path.exists() {
            return Err(RotationError::Store(format!(
                "Database not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), table, "opened configuration database");
        Self::from_connection(conn, table)
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection, table: &str) -> Result<Self> {
        validate_identifier(table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    /// Fetch the plain value stored under `key`.
    pub fn value(&self, key: &str) -> Result<String> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.table);
        self.conn
            .query_row(&sql, params![key], |row| row.get::<_, String>(0))
            .optional()?
            .ok_or_else(|| {
                RotationError::NotFound(format!(
                    "No row for key '{}' in table {}",
                    key, self.table
                ))
            })
    }

    /// Fetch a comma or semicolon separated list of email addresses.
    pub fn address_list(&self, key: &str) -> Result<Vec<String>> {
        let raw = self.value(key)?;
        let addresses: Vec<String> = raw
            .split([',', ';'])
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();
        if addresses.is_empty() {
            return Err(RotationError::NotFound(format!(
                "Key '{}' holds no email addresses",
                key
            )));
        }
        Ok(addresses)
    }
}

impl SecretStore for ConfigurationTable {
    fn read(&mut self, key: &str) -> Result<SecretString> {
        let value = self.value(key)?;
        Ok(SecretString::from(value))
    }

    fn write(&mut self, key: &str, value: &SecretString) -> Result<()> {
        let sql = format!("UPDATE {} SET value = ?1 WHERE key = ?2", self.table);
        let tx = self.conn.transaction()?;
        let updated = tx.execute(&sql, params![value.expose_secret(), key])?;
        if updated == 0 {
            // Dropping the transaction rolls it back.
            return Err(RotationError::Store(format!(
                "Update of key '{}' in table {} matched no row",
                key, self.table
            )));
        }
        tx.commit()?;
        debug!(key, rows = updated, "secret written");
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start
        || name.len() > ConfigurationTable::MAX_IDENTIFIER_BYTES
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(RotationError::InvalidInput(format!(
            "Invalid table name '{}'",
            name
        )));
    }
    Ok(())
}
