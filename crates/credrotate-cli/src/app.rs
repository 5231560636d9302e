//! Wiring of configuration, collaborators and the rotation.

use std::path::PathBuf;

use secrecy::SecretString;
use tracing::{error, warn};

use credrotate_core::notify;
use credrotate_core::schedule::{CronScheduler, SystemCrontab};
use credrotate_core::store::ConfigurationTable;
use credrotate_core::{
    CredentialChanger, Notification, Notifier, Result, RotationError, RotationOrchestrator,
    RotationSettings, SecretStore,
};

use crate::cli::Cli;
use crate::config::{
    default_backup_dir, default_database_path, home_dir, load_config, CredrotateConfig,
    NotificationSection, RotationSection,
};
use crate::errors::CliError;
use crate::mail::SmtpNotifier;

/// Run one rotation for the account named on the command line.
///
/// Only a failure to load the configuration or to resolve the notification
/// addresses returns early. Every later failure is reported by email.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let username = cli.username.as_str();

    let table = open_table(&config);
    let (sender, recipients) = resolve_addresses(&config.notification, table.as_ref().ok())?;
    let notifier = SmtpNotifier::new(
        &config.notification.smtp_host,
        config.notification.smtp_port,
    );
    let settings = RotationSettings {
        username: username.to_string(),
        frequency_days: cli.frequency,
        secret_key: config.rotation.secret_key.clone(),
        system_name: config.notification.system_name.clone(),
        sender,
        recipients,
    };

    let mut store: Box<dyn SecretStore> = match table {
        Ok(table) => Box::new(table),
        Err(err) => {
            warn!(error = %err, "configuration database unavailable");
            Box::new(UnavailableStore(format!("{:#}", err)))
        }
    };

    let collaborators = build_changer(&config.rotation)
        .and_then(|changer| Ok((changer, build_scheduler(&config)?)));
    let report = match collaborators {
        Ok((mut changer, mut scheduler)) => RotationOrchestrator::new(
            store.as_mut(),
            changer.as_mut(),
            &mut scheduler,
            &notifier,
            settings,
        )
        .run(),
        Err(err) => {
            error!(error = %err, "rotation could not be set up");
            RotationOrchestrator::report_setup_failure(&notifier, &settings, &err)
        }
    };

    if let Err(err) = report.delivery {
        return Err(CliError::notify_failed(err.to_string(), report.outcome.success).into());
    }
    if !report.outcome.success {
        let state = report
            .outcome
            .failed_at
            .map(|state| state.to_string())
            .unwrap_or_default();
        let kind = report.outcome.error_kind.unwrap_or("UnknownError");
        return Err(CliError::rotation_failed(state, kind).into());
    }
    Ok(())
}

/// Email a failure for an invocation whose arguments were rejected.
pub fn report_invalid_invocation(config_path: Option<&str>, detail: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let table = open_table(&config).ok();
    let (sender, recipients) = resolve_addresses(&config.notification, table.as_ref())?;
    let notification = Notification {
        sender,
        recipients,
        subject: notify::subject(&config.notification.system_name, false),
        body: format!("General failure: invalid invocation\n\n{}", detail),
    };
    SmtpNotifier::new(
        &config.notification.smtp_host,
        config.notification.smtp_port,
    )
    .send(&notification)?;
    Ok(())
}

fn open_table(config: &CredrotateConfig) -> anyhow::Result<ConfigurationTable> {
    let db_path = match config.database.path.as_deref() {
        Some(path) => PathBuf::from(path),
        None => default_database_path()?,
    };
    Ok(ConfigurationTable::open(&db_path, &config.database.table)?)
}

/// Sender and recipients: config overrides first, then the database.
fn resolve_addresses(
    notification: &NotificationSection,
    table: Option<&ConfigurationTable>,
) -> anyhow::Result<(String, Vec<String>)> {
    let lookup_failed = |what: &str, err: RotationError| {
        error!(error = %err, "cannot resolve notification {}", what);
        anyhow::anyhow!("Cannot resolve notification {}: {}", what, err)
    };
    let unavailable = || {
        RotationError::Store("configuration database unavailable".to_string())
    };

    let sender = match &notification.sender {
        Some(sender) => sender.clone(),
        None => {
            let table = table.ok_or_else(|| lookup_failed("sender", unavailable()))?;
            let mut addresses = table
                .address_list(&notification.sender_key)
                .map_err(|e| lookup_failed("sender", e))?;
            addresses.swap_remove(0)
        }
    };

    let recipients = match &notification.recipients {
        Some(recipients) if !recipients.is_empty() => recipients.clone(),
        _ => {
            let table = table.ok_or_else(|| lookup_failed("recipients", unavailable()))?;
            table
                .address_list(&notification.recipient_key)
                .map_err(|e| lookup_failed("recipients", e))?
        }
    };

    Ok((sender, recipients))
}

#[cfg(unix)]
fn build_changer(rotation: &RotationSection) -> Result<Box<dyn CredentialChanger>> {
    use std::time::Duration;

    use credrotate_core::changer::{InteractiveChanger, PtySpawner};
    use credrotate_core::password::PasswordGenerator;

    let generator = PasswordGenerator::new(rotation.password_length)?;
    let spawner = PtySpawner::new(
        rotation.passwd_program.clone(),
        Duration::from_secs(rotation.prompt_timeout_seconds),
    );
    Ok(Box::new(InteractiveChanger::new(
        spawner,
        generator,
        rotation.prompts.clone(),
    )))
}

#[cfg(not(unix))]
fn build_changer(_rotation: &RotationSection) -> Result<Box<dyn CredentialChanger>> {
    Err(RotationError::Change(
        "Interactive password change is only supported on Unix hosts".to_string(),
    ))
}

fn build_scheduler(config: &CredrotateConfig) -> Result<CronScheduler<SystemCrontab>> {
    let schedule_error = |e: anyhow::Error| RotationError::Schedule(format!("{:#}", e));

    let program = match config.schedule.program_path.as_deref() {
        Some(path) => PathBuf::from(path),
        None => std::env::current_exe().map_err(|e| {
            RotationError::Schedule(format!("Cannot determine own executable path: {}", e))
        })?,
    };
    let work_dir = match config.schedule.work_dir.as_deref() {
        Some(dir) => PathBuf::from(dir),
        None => home_dir().map_err(schedule_error)?,
    };
    let backup_dir = match config.schedule.backup_dir.as_deref() {
        Some(dir) => PathBuf::from(dir),
        None => default_backup_dir().map_err(schedule_error)?,
    };
    CronScheduler::new(SystemCrontab::new(work_dir, backup_dir), program)
}

/// Stands in for a database that could not be opened, so the failure is
/// still reported through the normal notification path.
struct UnavailableStore(String);

impl SecretStore for UnavailableStore {
    fn read(&mut self, _key: &str) -> Result<SecretString> {
        Err(RotationError::Store(self.0.clone()))
    }

    fn write(&mut self, _key: &str, _value: &SecretString) -> Result<()> {
        Err(RotationError::Store(self.0.clone()))
    }
}
