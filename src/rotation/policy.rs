// src/rotation/policy.rs
use crate::Error;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ROTATE_SIZE_MB: i64 = 10;
pub const DEFAULT_BACKUP_COUNT: i64 = 7;
pub const SIZE_CHECK_CYCLE: Duration = Duration::from_secs(30);
pub const DAILY_CHECK_CYCLE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RollingPolicy {
    #[default]
    Size,
    Daily,
}

/// Raw rotation options as a caller or a config file supplies them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct RotateOptions {
    pub logger_file: PathBuf,
    pub rolling_policy: RollingPolicy,
    /// Megabytes; zero or less falls back to the default.
    pub log_rotate_size: i64,
    /// Zero or less falls back to the default.
    pub log_backup_count: i64,
    /// Days between sweeps in daily mode.
    pub log_rotate_date: u32,
    /// Overrides the derived check cycle.
    pub check_interval_secs: Option<u64>,
}

/// One managed log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationTarget {
    pub file_path: PathBuf,
    pub dir: PathBuf,
    pub base_name: String,
}

impl RotationTarget {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, Error> {
        let file_path = file_path.as_ref().to_path_buf();
        let base_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidTarget(format!("{} has no file name", file_path.display()))
            })?
            .to_string();
        let dir = match file_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(RotationTarget {
            file_path,
            dir,
            base_name,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Roll once the file exceeds this many megabytes.
    Size(i64),
    /// Roll any non-empty file once per check cycle.
    Time,
}

impl Trigger {
    /// Threshold handed to the rollover check.
    pub fn max_size_mb(&self) -> i64 {
        match self {
            Trigger::Size(mb) => *mb,
            Trigger::Time => 0,
        }
    }
}

/// Validated, immutable rotation settings for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub target: RotationTarget,
    pub trigger: Trigger,
    /// Negative keeps every rotated copy.
    pub backup_count: i64,
    pub check_cycle: Duration,
}

impl RotationPolicy {
    pub fn from_options(options: &RotateOptions) -> Result<Self, Error> {
        let target = RotationTarget::new(&options.logger_file)?;
        let backup_count = if options.log_backup_count > 0 {
            options.log_backup_count
        } else {
            DEFAULT_BACKUP_COUNT
        };

        let (trigger, derived_cycle) = match options.rolling_policy {
            RollingPolicy::Size => {
                let size = if options.log_rotate_size > 0 {
                    options.log_rotate_size
                } else {
                    DEFAULT_ROTATE_SIZE_MB
                };
                (Trigger::Size(size), SIZE_CHECK_CYCLE)
            }
            RollingPolicy::Daily => {
                let days = options.log_rotate_date.max(1);
                (Trigger::Time, DAILY_CHECK_CYCLE * days)
            }
        };
        let check_cycle = options
            .check_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(derived_cycle);

        Ok(RotationPolicy {
            target,
            trigger,
            backup_count,
            check_cycle,
        })
    }

    pub fn with_check_cycle(mut self, check_cycle: Duration) -> Self {
        self.check_cycle = check_cycle;
        self
    }

    pub fn max_size_mb(&self) -> i64 {
        self.trigger.max_size_mb()
    }
}
