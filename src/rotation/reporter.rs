// src/rotation/reporter.rs
use parking_lot::Mutex;

/// Sink for everything the rotation engine has to say. Failures never leave
/// the engine as return values; they end up here as plain strings.
pub trait Reporter: Send + Sync {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Info(String),
    Error(String),
}

/// Keeps every report in memory. Useful when the caller wants to inspect
/// what went wrong instead of reading logs.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Error(msg) => Some(msg.clone()),
                Report::Info(_) => None,
            })
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, msg: &str) {
        log::info!("{}", msg);
        self.reports.lock().push(Report::Info(msg.to_string()));
    }

    fn error(&self, msg: &str) {
        log::error!("{}", msg);
        self.reports.lock().push(Report::Error(msg.to_string()));
    }
}
