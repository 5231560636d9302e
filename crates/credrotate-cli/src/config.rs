use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use credrotate_core::changer::PasswdPrompts;
use credrotate_core::orchestrator::{DEFAULT_SECRET_KEY, DEFAULT_SYSTEM_NAME};
use credrotate_core::password::DEFAULT_LENGTH;
use credrotate_core::store::DEFAULT_TABLE;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredrotateConfig {
    pub database: DatabaseSection,
    pub rotation: RotationSection,
    pub schedule: ScheduleSection,
    pub notification: NotificationSection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Defaults to `$XDG_DATA_HOME/credrotate/config.db`.
    pub path: Option<String>,
    pub table: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSection {
    pub secret_key: String,
    pub password_length: usize,
    pub passwd_program: String,
    pub prompt_timeout_seconds: u64,
    pub prompts: PasswdPrompts,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// Path written into the crontab. Defaults to the running executable.
    pub program_path: Option<String>,
    /// Directory for the temporary crontab file. Defaults to `$HOME`.
    pub work_dir: Option<String>,
    /// Directory for crontab backups. Defaults to `$XDG_DATA_HOME/credrotate/cron-backups`.
    pub backup_dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSection {
    pub system_name: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Overrides the sender looked up under `sender_key`.
    pub sender: Option<String>,
    /// Overrides the recipients looked up under `recipient_key`.
    pub recipients: Option<Vec<String>>,
    pub sender_key: String,
    pub recipient_key: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl Default for RotationSection {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            password_length: DEFAULT_LENGTH,
            passwd_program: "passwd".to_string(),
            prompt_timeout_seconds: 30,
            prompts: PasswdPrompts::default(),
        }
    }
}

impl Default for NotificationSection {
    fn default() -> Self {
        Self {
            system_name: DEFAULT_SYSTEM_NAME.to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            sender: None,
            recipients: None,
            sender_key: "espa_address".to_string(),
            recipient_key: "cred_notification".to_string(),
        }
    }
}

/// Config file path from `--config`/`CREDROTATE_CONFIG`, else the XDG default.
///
/// The flag marks the path as explicit: an explicit file must exist, a
/// missing default file means built-in defaults.
pub fn resolve_config_path(explicit: Option<&str>) -> anyhow::Result<(PathBuf, bool)> {
    if let Some(value) = explicit {
        if !value.trim().is_empty() {
            return Ok((PathBuf::from(value), true));
        }
    }
    Ok((default_config_path()?, false))
}

pub fn load_config(explicit: Option<&str>) -> anyhow::Result<CredrotateConfig> {
    let (path, is_explicit) = resolve_config_path(explicit)?;
    if !path.exists() {
        if is_explicit {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }
        return Ok(CredrotateConfig::default());
    }
    read_config(&path)
}

pub fn read_config(path: &Path) -> anyhow::Result<CredrotateConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_database_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("config.db"))
}

pub fn default_backup_dir() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("cron-backups"))
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("credrotate"));
        }
    }
    Ok(home_dir()?.join(".config").join("credrotate"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("credrotate"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("credrotate"))
}

pub fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
