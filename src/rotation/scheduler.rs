// src/rotation/scheduler.rs
use crate::rotation::backup::backup;
use crate::rotation::matcher::{list_files, ACTIVE_LOG_PATTERN};
use crate::rotation::policy::RotationPolicy;
use crate::rotation::reporter::{LogReporter, Reporter};
use crate::rotation::rollover::maybe_rollover;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Runs rotation passes against a reporter.
#[derive(Clone)]
pub struct Rotator {
    reporter: Arc<dyn Reporter>,
}

impl Rotator {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Rotator { reporter }
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Rollover then backup for a single file. A panic in either stage is
    /// reported and swallowed. Returns false if the pass panicked.
    pub fn rotate_file(&self, file: &Path, max_size_mb: i64, max_backup_count: i64) -> bool {
        let reporter = self.reporter.as_ref();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            maybe_rollover(file, max_size_mb, max_backup_count, reporter);
            backup(file, max_backup_count, reporter);
        }));
        if result.is_err() {
            reporter.error(&format!(
                "LogRotate file path: {} catch an exception.",
                file.display()
            ));
            return false;
        }
        true
    }

    /// One pass over every `*.log`, `*.trace` and `*.out` file under `dir`.
    /// Returns the number of files visited.
    pub fn rotate_dir(&self, dir: &Path, max_size_mb: i64, max_backup_count: i64) -> usize {
        let reporter = self.reporter.as_ref();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let pattern = match Regex::new(ACTIVE_LOG_PATTERN) {
                Ok(p) => p,
                Err(e) => {
                    reporter.error(&format!("build log pattern failed: {}", e));
                    return 0;
                }
            };
            let files = match list_files(dir, &pattern, reporter) {
                Ok(files) => files,
                Err(e) => {
                    reporter.error(&format!("walk path: {} failed: {}", dir.display(), e));
                    return 0;
                }
            };
            for file in &files {
                self.rotate_file(file, max_size_mb, max_backup_count);
            }
            files.len()
        }));
        match result {
            Ok(visited) => visited,
            Err(cause) => {
                reporter.error(&format!(
                    "LogRotate catch an exception, {}",
                    panic_message(cause.as_ref())
                ));
                0
            }
        }
    }
}

impl Default for Rotator {
    fn default() -> Self {
        Rotator::new(Arc::new(LogReporter))
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Synchronous one-shot rotation of every log file in `dir`.
pub fn log_rotate<P: AsRef<Path>>(
    dir: P,
    max_size_mb: i64,
    max_backup_count: i64,
    reporter: Arc<dyn Reporter>,
) {
    Rotator::new(reporter).rotate_dir(dir.as_ref(), max_size_mb, max_backup_count);
}

struct Registration {
    policy: RotationPolicy,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

/// At most one background rotation task per directory.
///
/// Entries are never removed; `shutdown` stops the tasks but a stopped
/// directory stays registered.
pub struct SchedulerRegistry {
    rotator: Rotator,
    entries: Mutex<HashMap<PathBuf, Registration>>,
}

impl SchedulerRegistry {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        SchedulerRegistry {
            rotator: Rotator::new(reporter),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a rotation task for the policy's directory unless one is
    /// already registered. Must be called from within a tokio runtime;
    /// without one the failure is reported and nothing is registered.
    pub fn rotate(&self, policy: RotationPolicy) {
        let key = policy.target.dir.clone();
        let reporter = Arc::clone(self.rotator.reporter());

        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                reporter.error(&format!(
                    "start log rotate task for {} failed: {}",
                    key.display(),
                    e
                ));
                return;
            }
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run_loop(self.rotator.clone(), policy.clone(), stop_rx));
        entries.insert(
            key,
            Registration {
                policy,
                stop_tx,
                task: Some(task),
            },
        );
    }

    pub fn is_registered<P: AsRef<Path>>(&self, dir: P) -> bool {
        self.entries.lock().contains_key(dir.as_ref())
    }

    pub fn policy<P: AsRef<Path>>(&self, dir: P) -> Option<RotationPolicy> {
        self.entries
            .lock()
            .get(dir.as_ref())
            .map(|r| r.policy.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signals every task to stop and waits for the ones still running.
    pub async fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut entries = self.entries.lock();
            entries
                .values_mut()
                .filter_map(|r| {
                    let _ = r.stop_tx.send(true);
                    r.task.take()
                })
                .collect()
        };
        for task in tasks {
            if let Err(e) = task.await {
                self.rotator
                    .reporter()
                    .error(&format!("log rotate task ended abnormally: {}", e));
            }
        }
    }
}

impl Default for SchedulerRegistry {
    fn default() -> Self {
        SchedulerRegistry::new(Arc::new(LogReporter))
    }
}

async fn run_loop(rotator: Rotator, policy: RotationPolicy, mut stop_rx: watch::Receiver<bool>) {
    let reporter = Arc::clone(rotator.reporter());
    reporter.info(&format!(
        "start log rotate task for {}",
        policy.target.dir.display()
    ));
    let dir = policy.target.dir.clone();
    let max_size_mb = policy.max_size_mb();
    let backup_count = policy.backup_count;

    loop {
        let pass_rotator = rotator.clone();
        let pass_dir = dir.clone();
        let pass = tokio::task::spawn_blocking(move || {
            pass_rotator.rotate_dir(&pass_dir, max_size_mb, backup_count)
        });
        if let Err(e) = pass.await {
            reporter.error(&format!("LogRotate catch an exception, {}", e));
        }

        tokio::select! {
            _ = tokio::time::sleep(policy.check_cycle) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
    reporter.info(&format!("stop log rotate task for {}", dir.display()));
}
