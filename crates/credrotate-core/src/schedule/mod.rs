//! Self-rescheduling.
//!
//! After a rotation the next run is written into the recurring job table as
//! a one-shot date (`06:00` on `today + frequency`), invoking this program
//! again with the same account and frequency.

pub mod crontab;

pub use crontab::{merge_job_line, JobTable, MergedTable, SystemCrontab};

use std::path::PathBuf;

use chrono::{Datelike, Days, Local, NaiveDate};
use tracing::info;

use crate::error::{Result, RotationError};

/// Installs the next run of the rotation.
pub trait Scheduler {
    fn reschedule(&mut self, username: &str, frequency_days: u32) -> Result<()>;
}

/// The next scheduled invocation of the rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub username: String,
    pub frequency_days: u32,
    pub next_run: NaiveDate,
}

impl JobDescriptor {
    pub fn new(username: &str, frequency_days: u32, today: NaiveDate) -> Result<Self> {
        if frequency_days == 0 {
            return Err(RotationError::InvalidInput(
                "Frequency must be at least one day".to_string(),
            ));
        }
        let next_run = today
            .checked_add_days(Days::new(u64::from(frequency_days)))
            .ok_or_else(|| {
                RotationError::InvalidInput(format!(
                    "Frequency of {} days is out of range",
                    frequency_days
                ))
            })?;
        Ok(Self {
            username: username.to_string(),
            frequency_days,
            next_run,
        })
    }

    /// Crontab line running `program` at 06:00 on the next run date.
    pub fn cron_line(&self, program: &str) -> String {
        format!(
            "00 06 {} {} * {} -u {} -f {}",
            self.next_run.day(),
            self.next_run.month(),
            program,
            self.username,
            self.frequency_days
        )
    }
}

/// Scheduler writing to a [`JobTable`], matching entries by program path.
pub struct CronScheduler<T> {
    table: T,
    program: String,
    fixed_today: Option<NaiveDate>,
}

impl<T: JobTable> CronScheduler<T> {
    /// `program` is the absolute path the job line invokes and the key used
    /// to find this program's existing entry.
    ///
    /// The path is written unquoted and matched as a single crontab field,
    /// so it must be valid UTF-8 without whitespace.
    pub fn new(table: T, program: impl Into<PathBuf>) -> Result<Self> {
        let program = program.into();
        let program = program
            .to_str()
            .ok_or_else(|| {
                RotationError::Schedule(format!(
                    "Program path {} is not valid UTF-8",
                    program.display()
                ))
            })?
            .to_string();
        if program.is_empty() || program.chars().any(char::is_whitespace) {
            return Err(RotationError::Schedule(format!(
                "Program path {:?} cannot be used in a crontab entry",
                program
            )));
        }
        Ok(Self {
            table,
            program,
            fixed_today: None,
        })
    }

    /// Compute next runs from `today` instead of the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

impl<T: JobTable> Scheduler for CronScheduler<T> {
    fn reschedule(&mut self, username: &str, frequency_days: u32) -> Result<()> {
        self.table.backup()?;

        let job = JobDescriptor::new(username, frequency_days, self.today())?;
        let line = job.cron_line(&self.program);

        let existing = self.table.load()?;
        let merged = merge_job_line(existing, &self.program, &line);
        self.table.install(&merged.lines)?;

        info!(
            username,
            frequency_days,
            next_run = %job.next_run,
            replaced = merged.replaced,
            "next rotation scheduled"
        );
        Ok(())
    }
}
