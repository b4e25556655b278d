// src/config.rs
use crate::rotation::{RotateOptions, RotationPolicy};
use crate::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Daemon configuration: one `[[target]]` table per managed log file.
///
/// ```toml
/// [[target]]
/// logger_file = "/var/log/svc/svc.log"
/// rolling_policy = "size"
/// log_rotate_size = 20
/// log_backup_count = 5
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "target")]
    pub targets: Vec<RotateOptions>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, Error> {
        Ok(toml::from_str(raw)?)
    }

    pub fn policies(&self) -> Result<Vec<RotationPolicy>, Error> {
        self.targets.iter().map(RotationPolicy::from_options).collect()
    }
}
