use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::NaiveDate;
use rusqlite::Connection;
use secrecy::{ExposeSecret, SecretString};

use credrotate_core::changer::{InteractiveChanger, PasswdPrompts, PromptSession, SessionSpawner};
use credrotate_core::password::CandidateSource;
use credrotate_core::schedule::{CronScheduler, JobTable};
use credrotate_core::store::{ConfigurationTable, DEFAULT_TABLE};
use credrotate_core::{
    CredentialChanger, Notification, Notifier, Result, RotationError, RotationOrchestrator,
    RotationSettings, RotationState, Scheduler, SecretStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Read(String),
    Change(String),
    Write(String, String),
    Reschedule(String, u32),
}

type CallLog = Rc<RefCell<Vec<Call>>>;

struct FakeStore {
    calls: CallLog,
    value: Option<&'static str>,
    fail_write: bool,
}

impl SecretStore for FakeStore {
    fn read(&mut self, key: &str) -> Result<SecretString> {
        self.calls.borrow_mut().push(Call::Read(key.to_string()));
        self.value
            .map(SecretString::from)
            .ok_or_else(|| RotationError::NotFound(format!("No row for key '{}'", key)))
    }

    fn write(&mut self, key: &str, value: &SecretString) -> Result<()> {
        self.calls.borrow_mut().push(Call::Write(
            key.to_string(),
            value.expose_secret().to_string(),
        ));
        if self.fail_write {
            return Err(RotationError::Store("database is locked".to_string()));
        }
        Ok(())
    }
}

struct FakeChanger {
    calls: CallLog,
    result: std::result::Result<&'static str, &'static str>,
}

impl CredentialChanger for FakeChanger {
    fn change(&mut self, old_password: &SecretString) -> Result<SecretString> {
        self.calls
            .borrow_mut()
            .push(Call::Change(old_password.expose_secret().to_string()));
        match self.result {
            Ok(value) => Ok(SecretString::from(value)),
            Err(reason) => Err(RotationError::InvalidCredential(reason.to_string())),
        }
    }
}

struct FakeScheduler {
    calls: CallLog,
}

impl Scheduler for FakeScheduler {
    fn reschedule(&mut self, username: &str, frequency_days: u32) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::Reschedule(username.to_string(), frequency_days));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

struct ScriptedSession {
    output: VecDeque<&'static str>,
    sent: Rc<RefCell<Vec<String>>>,
}

impl PromptSession for ScriptedSession {
    fn expect_any(&mut self, patterns: &[&str]) -> Result<usize> {
        let next = self
            .output
            .pop_front()
            .ok_or_else(|| RotationError::Change("Timed out".to_string()))?;
        patterns
            .iter()
            .position(|p| next.contains(p))
            .ok_or_else(|| RotationError::Change(format!("Unexpected output {:?}", next)))
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        self.sent.borrow_mut().push(line.to_string());
        Ok(())
    }
}

struct ScriptedSpawner {
    output: Vec<&'static str>,
    sent: Rc<RefCell<Vec<String>>>,
}

impl SessionSpawner for ScriptedSpawner {
    fn spawn(&mut self) -> Result<Box<dyn PromptSession>> {
        Ok(Box::new(ScriptedSession {
            output: self.output.iter().copied().collect(),
            sent: Rc::clone(&self.sent),
        }))
    }
}

struct StubCandidates(VecDeque<&'static str>);

impl CandidateSource for StubCandidates {
    fn next_candidate(&mut self) -> Result<SecretString> {
        self.0
            .pop_front()
            .map(SecretString::from)
            .ok_or_else(|| RotationError::Change("Out of candidates".to_string()))
    }
}

#[derive(Default)]
struct MemoryTable {
    lines: Vec<String>,
}

impl JobTable for MemoryTable {
    fn backup(&mut self) -> Result<()> {
        Ok(())
    }

    fn load(&mut self) -> Result<Vec<String>> {
        Ok(self.lines.clone())
    }

    fn install(&mut self, lines: &[String]) -> Result<()> {
        self.lines = lines.to_vec();
        Ok(())
    }
}

fn settings() -> RotationSettings {
    RotationSettings {
        username: "espa".to_string(),
        frequency_days: 60,
        secret_key: "landsatds.password".to_string(),
        system_name: "LSRD".to_string(),
        sender: "espa@example.com".to_string(),
        recipients: vec!["ops@example.com".to_string()],
    }
}

const WEAK_THEN_ACCEPTED: [&str; 5] = [
    "Password: ",
    "New password: ",
    "BAD PASSWORD: The password is too similar to the old one",
    "Retype new password: ",
    "passwd: all authentication tokens updated successfully.",
];

#[test]
fn test_end_to_end_success_with_rejected_first_candidate() {
    let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut store = FakeStore {
        calls: Rc::clone(&calls),
        value: Some("OldPass1!"),
        fail_write: false,
    };
    let mut changer = InteractiveChanger::new(
        ScriptedSpawner {
            output: WEAK_THEN_ACCEPTED.to_vec(),
            sent: Rc::clone(&sent),
        },
        StubCandidates(VecDeque::from(["NewPass2@", "Valid3#A"])),
        PasswdPrompts::default(),
    );
    let mut scheduler = FakeScheduler {
        calls: Rc::clone(&calls),
    };
    let notifier = RecordingNotifier::default();

    let report = RotationOrchestrator::new(
        &mut store,
        &mut changer,
        &mut scheduler,
        &notifier,
        settings(),
    )
    .run();

    assert!(report.outcome.success);
    assert_eq!(report.outcome.state, RotationState::Done);
    assert!(report.delivery.is_ok());
    assert_eq!(
        *calls.borrow(),
        vec![
            Call::Read("landsatds.password".to_string()),
            Call::Write("landsatds.password".to_string(), "Valid3#A".to_string()),
            Call::Reschedule("espa".to_string(), 60),
        ]
    );
    assert_eq!(
        *sent.borrow(),
        vec!["OldPass1!", "NewPass2@", "Valid3#A", "Valid3#A"]
    );

    let notifications = notifier.sent.borrow();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].subject.contains("Successful"));
    assert_eq!(notifications[0].subject, "LSRD - Auto-credential Successful");
    assert_eq!(notifications[0].body, "User: espa password has been updated");
    assert_eq!(notifications[0].sender, "espa@example.com");
    assert_eq!(notifications[0].recipients, vec!["ops@example.com"]);
}

#[test]
fn test_missing_secret_skips_change_and_reports_failure() {
    let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut store = FakeStore {
        calls: Rc::clone(&calls),
        value: None,
        fail_write: false,
    };
    let mut changer = FakeChanger {
        calls: Rc::clone(&calls),
        result: Ok("Valid3#A"),
    };
    let mut scheduler = FakeScheduler {
        calls: Rc::clone(&calls),
    };
    let notifier = RecordingNotifier::default();

    let report = RotationOrchestrator::new(
        &mut store,
        &mut changer,
        &mut scheduler,
        &notifier,
        settings(),
    )
    .run();

    assert!(!report.outcome.success);
    assert_eq!(report.outcome.state, RotationState::Failed);
    assert_eq!(report.outcome.failed_at, Some(RotationState::ReadSecret));
    assert_eq!(report.outcome.error_kind, Some("NotFoundError"));
    assert_eq!(
        *calls.borrow(),
        vec![Call::Read("landsatds.password".to_string())]
    );

    let notifications = notifier.sent.borrow();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].subject.contains("Failure"));
    assert!(notifications[0].body.contains("NotFoundError"));
}

#[test]
fn test_failed_write_never_reschedules() {
    let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut store = FakeStore {
        calls: Rc::clone(&calls),
        value: Some("OldPass1!"),
        fail_write: true,
    };
    let mut changer = FakeChanger {
        calls: Rc::clone(&calls),
        result: Ok("Valid3#A"),
    };
    let mut scheduler = FakeScheduler {
        calls: Rc::clone(&calls),
    };
    let notifier = RecordingNotifier::default();

    let report = RotationOrchestrator::new(
        &mut store,
        &mut changer,
        &mut scheduler,
        &notifier,
        settings(),
    )
    .run();

    assert_eq!(report.outcome.failed_at, Some(RotationState::WriteSecret));
    let reschedules = calls
        .borrow()
        .iter()
        .filter(|call| matches!(call, Call::Reschedule(..)))
        .count();
    assert_eq!(reschedules, 0);
    let notifications = notifier.sent.borrow();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].body.contains("StoreError"));
}

#[test]
fn test_rejected_old_password_is_never_written() {
    let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut store = FakeStore {
        calls: Rc::clone(&calls),
        value: Some("Drifted1!"),
        fail_write: false,
    };
    let mut changer = FakeChanger {
        calls: Rc::clone(&calls),
        result: Err("Password retrieved from the store was rejected"),
    };
    let mut scheduler = FakeScheduler {
        calls: Rc::clone(&calls),
    };
    let notifier = RecordingNotifier::default();

    let report = RotationOrchestrator::new(
        &mut store,
        &mut changer,
        &mut scheduler,
        &notifier,
        settings(),
    )
    .run();

    assert_eq!(report.outcome.failed_at, Some(RotationState::ChangePassword));
    assert_eq!(
        *calls.borrow(),
        vec![
            Call::Read("landsatds.password".to_string()),
            Call::Change("Drifted1!".to_string()),
        ]
    );
    assert!(notifier.sent.borrow()[0]
        .body
        .contains("InvalidCredentialError"));
}

#[test]
fn test_full_stack_with_sqlite_and_crontab_table() {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    conn.execute_batch(
        "CREATE TABLE ordering_configuration (key TEXT PRIMARY KEY, value TEXT NOT NULL);
         INSERT INTO ordering_configuration VALUES ('landsatds.password', 'OldPass1!');",
    )
    .expect("seed table");
    let mut store =
        ConfigurationTable::from_connection(conn, DEFAULT_TABLE).expect("wrap connection");
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut changer = InteractiveChanger::new(
        ScriptedSpawner {
            output: WEAK_THEN_ACCEPTED.to_vec(),
            sent: Rc::clone(&sent),
        },
        StubCandidates(VecDeque::from(["NewPass2@", "Valid3#A"])),
        PasswdPrompts::default(),
    );
    let mut scheduler = CronScheduler::new(MemoryTable::default(), "/usr/local/bin/credrotate")
        .expect("valid program path")
        .with_today(NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date"));
    let notifier = RecordingNotifier::default();

    let report = RotationOrchestrator::new(
        &mut store,
        &mut changer,
        &mut scheduler,
        &notifier,
        settings(),
    )
    .run();

    assert!(report.outcome.success);
    assert_eq!(
        store.value("landsatds.password").expect("stored value"),
        "Valid3#A"
    );
    assert_eq!(
        scheduler.table().lines.last().map(String::as_str),
        Some("00 06 15 12 * /usr/local/bin/credrotate -u espa -f 60")
    );
}

#[test]
fn test_setup_failure_is_reported_once_without_touching_anything() {
    let notifier = RecordingNotifier::default();
    let err = RotationError::InvalidInput("Password length must be at least 4 (got 3)".to_string());

    let report = RotationOrchestrator::report_setup_failure(&notifier, &settings(), &err);

    assert!(!report.outcome.success);
    assert_eq!(report.outcome.failed_at, Some(RotationState::Start));
    assert_eq!(report.outcome.error_kind, Some("InvalidInputError"));
    assert!(report.delivery.is_ok());

    let notifications = notifier.sent.borrow();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].subject, "LSRD - Auto-credential Failure");
    assert!(notifications[0].body.contains("Password length must be at least 4"));
    assert!(notifications[0].body.contains("Stored secret: unchanged"));
}

#[test]
fn test_unconfirmed_change_is_never_written() {
    let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut store = FakeStore {
        calls: Rc::clone(&calls),
        value: Some("OldPass1!"),
        fail_write: false,
    };
    let mut changer = InteractiveChanger::new(
        ScriptedSpawner {
            output: vec!["Password: ", "New password: ", "Retype new password: "],
            sent: Rc::clone(&sent),
        },
        StubCandidates(VecDeque::from(["Valid3#A"])),
        PasswdPrompts::default(),
    );
    let mut scheduler = FakeScheduler {
        calls: Rc::clone(&calls),
    };
    let notifier = RecordingNotifier::default();

    let report = RotationOrchestrator::new(
        &mut store,
        &mut changer,
        &mut scheduler,
        &notifier,
        settings(),
    )
    .run();

    assert_eq!(report.outcome.failed_at, Some(RotationState::ChangePassword));
    assert_eq!(report.outcome.error_kind, Some("UnconfirmedChangeError"));
    assert_eq!(
        *calls.borrow(),
        vec![Call::Read("landsatds.password".to_string())]
    );
    let notifications = notifier.sent.borrow();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0]
        .body
        .contains("system password state is unknown"));
}
