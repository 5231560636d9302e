//! Rotation state machine.
//!
//! ```text
//! START -> READ_SECRET -> CHANGE_PASSWORD -> WRITE_SECRET -> RESCHEDULE -> DONE
//!              \________________\_________________\______________\-> FAILED
//! ```
//!
//! Each state makes exactly one collaborator call. The first error aborts
//! the remaining states, so a password the system never confirmed is never
//! stored and a failed store never reschedules. Both terminal states hand
//! exactly one notification to the notifier.

use std::fmt;

use tracing::{error, info};

use crate::changer::CredentialChanger;
use crate::error::{Result, RotationError};
use crate::notify::{self, Notification, Notifier};
use crate::schedule::Scheduler;
use crate::store::SecretStore;

/// Default key of the stored secret.
pub const DEFAULT_SECRET_KEY: &str = "landsatds.password";

/// Default system name used in the notification subject.
pub const DEFAULT_SYSTEM_NAME: &str = "LSRD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Start,
    ReadSecret,
    ChangePassword,
    WriteSecret,
    Reschedule,
    Done,
    Failed,
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RotationState::Start => "START",
            RotationState::ReadSecret => "READ_SECRET",
            RotationState::ChangePassword => "CHANGE_PASSWORD",
            RotationState::WriteSecret => "WRITE_SECRET",
            RotationState::Reschedule => "RESCHEDULE",
            RotationState::Done => "DONE",
            RotationState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Per-run parameters, passed in rather than read from globals.
#[derive(Debug, Clone)]
pub struct RotationSettings {
    pub username: String,
    pub frequency_days: u32,
    pub secret_key: String,
    pub system_name: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

/// Final result of a rotation, as reported to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub success: bool,
    /// `Done` or `Failed`.
    pub state: RotationState,
    /// State whose collaborator call failed.
    pub failed_at: Option<RotationState>,
    /// Kind name of the failure, e.g. `ChangeError`.
    pub error_kind: Option<&'static str>,
    pub message: String,
}

/// Outcome plus the result of delivering its notification.
#[derive(Debug)]
pub struct RotationReport {
    pub outcome: RotationOutcome,
    pub delivery: Result<()>,
}

/// Sequences one rotation and reports it.
pub struct RotationOrchestrator<'a> {
    store: &'a mut dyn SecretStore,
    changer: &'a mut dyn CredentialChanger,
    scheduler: &'a mut dyn Scheduler,
    notifier: &'a dyn Notifier,
    settings: RotationSettings,
}

impl<'a> RotationOrchestrator<'a> {
    pub fn new(
        store: &'a mut dyn SecretStore,
        changer: &'a mut dyn CredentialChanger,
        scheduler: &'a mut dyn Scheduler,
        notifier: &'a dyn Notifier,
        settings: RotationSettings,
    ) -> Self {
        Self {
            store,
            changer,
            scheduler,
            notifier,
            settings,
        }
    }

    /// Run the rotation to a terminal state and send the notification.
    pub fn run(mut self) -> RotationReport {
        let mut state = RotationState::Start;
        info!(
            username = %self.settings.username,
            frequency_days = self.settings.frequency_days,
            "starting credential rotation"
        );

        let outcome = match self.rotate(&mut state) {
            Ok(()) => {
                info!(username = %self.settings.username, "rotation complete");
                RotationOutcome {
                    success: true,
                    state: RotationState::Done,
                    failed_at: None,
                    error_kind: None,
                    message: format!(
                        "User: {} password has been updated",
                        self.settings.username
                    ),
                }
            }
            Err(err) => failed_outcome(&self.settings.username, state, &err),
        };

        deliver(self.notifier, &self.settings, outcome)
    }

    /// Report a rotation that could not be assembled.
    ///
    /// Used when a collaborator cannot even be constructed. Nothing has been
    /// touched yet, so the failure is attributed to `START` and still ends in
    /// exactly one notification.
    pub fn report_setup_failure(
        notifier: &dyn Notifier,
        settings: &RotationSettings,
        err: &RotationError,
    ) -> RotationReport {
        let outcome = failed_outcome(&settings.username, RotationState::Start, err);
        deliver(notifier, settings, outcome)
    }

    fn rotate(&mut self, state: &mut RotationState) -> Result<()> {
        let key = self.settings.secret_key.as_str();

        *state = RotationState::ReadSecret;
        info!(state = %state, key, "reading stored secret");
        let old_password = self.store.read(key)?;

        *state = RotationState::ChangePassword;
        info!(state = %state, "changing system password");
        let new_password = self.changer.change(&old_password)?;

        *state = RotationState::WriteSecret;
        info!(state = %state, key, "storing new secret");
        self.store.write(key, &new_password)?;

        *state = RotationState::Reschedule;
        info!(state = %state, "scheduling next rotation");
        self.scheduler
            .reschedule(&self.settings.username, self.settings.frequency_days)?;

        Ok(())
    }
}

fn failed_outcome(username: &str, state: RotationState, err: &RotationError) -> RotationOutcome {
    error!(state = %state, kind = err.kind(), error = %err, "rotation failed");
    RotationOutcome {
        success: false,
        state: RotationState::Failed,
        failed_at: Some(state),
        error_kind: Some(err.kind()),
        message: failure_report(username, state, err),
    }
}

fn deliver(
    notifier: &dyn Notifier,
    settings: &RotationSettings,
    outcome: RotationOutcome,
) -> RotationReport {
    let notification = Notification {
        sender: settings.sender.clone(),
        recipients: settings.recipients.clone(),
        subject: notify::subject(&settings.system_name, outcome.success),
        body: outcome.message.clone(),
    };
    let delivery = notifier.send(&notification);
    match &delivery {
        Ok(()) => info!(
            recipients = notification.recipients.len(),
            subject = %notification.subject,
            "notification sent"
        ),
        Err(err) => error!(error = %err, "notification could not be sent"),
    }

    RotationReport { outcome, delivery }
}

fn failure_report(username: &str, state: RotationState, err: &RotationError) -> String {
    let stored = match (state, err) {
        (_, RotationError::UnconfirmedChange(_)) => {
            "unchanged, but the system password state is unknown (the new password may have been applied)"
        }
        (RotationState::Reschedule, _) => "updated to the new password",
        (RotationState::WriteSecret, _) => "NOT updated, but the system password WAS changed",
        _ => "unchanged",
    };
    format!(
        "Rotation for user {} failed in state {}.\n\n{}: {}\n\nStored secret: {}\nDetail: {:?}\n",
        username,
        state,
        err.kind(),
        err,
        stored,
        err
    )
}
