//! Crontab maintenance.
//!
//! [`merge_job_line`] is the pure table edit; [`SystemCrontab`] runs the
//! `crontab` binary to back up, read, and install tables.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::Local;
use tracing::{debug, info};

use crate::error::{Result, RotationError};
use crate::fs::write_atomic;

/// Comment block written above the job line when it is first added.
pub const BANNER: [&str; 3] = [
    "#-----------------------------",
    "# Environment Credential Updating",
    "#-----------------------------",
];

/// Storage of the recurring job table.
pub trait JobTable {
    /// Keep a copy of the current table before it is modified.
    fn backup(&mut self) -> Result<()>;

    /// Current table, one entry per line.
    fn load(&mut self) -> Result<Vec<String>>;

    /// Replace the whole table with `lines`.
    fn install(&mut self, lines: &[String]) -> Result<()>;
}

/// Result of merging a job line into a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTable {
    pub lines: Vec<String>,
    /// Number of existing lines that were replaced. Zero means appended.
    pub replaced: usize,
}

/// Put `job_line` into `existing`.
///
/// Every non-comment line naming `program` as one of its fields is
/// replaced in place. If there is none, the banner and the job line are
/// appended. Trailing blank lines are dropped so repeated merges produce
/// the same table.
pub fn merge_job_line(existing: Vec<String>, program: &str, job_line: &str) -> MergedTable {
    let mut lines = existing;
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    let mut replaced = 0;
    for line in lines.iter_mut() {
        if references_program(line, program) {
            *line = job_line.to_string();
            replaced += 1;
        }
    }

    if replaced == 0 {
        lines.extend(BANNER.iter().map(|line| line.to_string()));
        lines.push(job_line.to_string());
    }

    MergedTable { lines, replaced }
}

fn references_program(line: &str, program: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.starts_with('#') && trimmed.split_whitespace().any(|field| field == program)
}

/// The invoking user's crontab, managed through the `crontab` command.
#[derive(Debug, Clone)]
pub struct SystemCrontab {
    command: Vec<String>,
    work_dir: PathBuf,
    backup_dir: PathBuf,
}

impl SystemCrontab {
    const TEMP_FILE: &'static str = "cron.tmp";

    /// `work_dir` receives the temporary install file, `backup_dir` the
    /// timestamped backups.
    pub fn new(work_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: vec!["crontab".to_string()],
            work_dir: work_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Replace the `crontab` invocation, e.g. with an interpreter and script.
    pub fn with_command<I, A>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let command: Vec<String> = command.into_iter().map(Into::into).collect();
        if !command.is_empty() {
            self.command = command;
        }
        self
    }

    pub fn temp_file(&self) -> PathBuf {
        self.work_dir.join(Self::TEMP_FILE)
    }

    fn run(&self, arg: &Path) -> Result<Output> {
        let (program, leading) = self
            .command
            .split_first()
            .ok_or_else(|| RotationError::Schedule("Empty crontab command".to_string()))?;
        Command::new(program)
            .args(leading)
            .arg(arg)
            .output()
            .map_err(|e| RotationError::Schedule(format!("Failed to run {}: {}", program, e)))
    }

    fn list(&self) -> Result<String> {
        let output = self.run(Path::new("-l"))?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no crontab") {
            debug!("no existing crontab, starting from an empty table");
            return Ok(String::new());
        }
        Err(RotationError::Schedule(format!(
            "Failed to list crontab: {}",
            stderr.trim()
        )))
    }
}

impl JobTable for SystemCrontab {
    fn backup(&mut self) -> Result<()> {
        let contents = self.list()?;
        let stamp = Local::now().format("%Y%m%d%H%M%S");
        let path = self.backup_dir.join(format!("crontab-{}.bak", stamp));
        write_atomic(&path, contents.as_bytes()).map_err(|e| {
            RotationError::Schedule(format!(
                "Failed to write crontab backup {}: {}",
                path.display(),
                e
            ))
        })?;
        info!(path = %path.display(), "crontab backed up");
        Ok(())
    }

    fn load(&mut self) -> Result<Vec<String>> {
        Ok(self.list()?.lines().map(str::to_string).collect())
    }

    fn install(&mut self, lines: &[String]) -> Result<()> {
        let temp = self.temp_file();
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::write(&temp, format!("{}\n", lines.join("\n")))?;

        let output = self.run(&temp)?;
        let report = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !output.status.success() || report.contains("errors") {
            return Err(RotationError::Schedule(format!(
                "Password updated, but crontab install failed (table left at {}):\n{}",
                temp.display(),
                report.trim()
            )));
        }

        std::fs::remove_file(&temp)?;
        Ok(())
    }
}
