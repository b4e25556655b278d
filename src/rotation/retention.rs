// src/rotation/retention.rs
use crate::rotation::matcher::{backup_pattern, list_siblings, rollover_pattern};
use crate::rotation::reporter::Reporter;
use crate::Error;
use std::fs;
use std::path::Path;

/// Which kind of rotated artifact a prune pass looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Raw copies: `<base>.<1-17 digits>`.
    Rollover,
    /// Archives: `<base>.<17 digits>.zip`.
    Backup,
}

impl Stage {
    pub fn parse(stage: &str) -> Option<Stage> {
        match stage {
            "rollover" => Some(Stage::Rollover),
            "backup" => Some(Stage::Backup),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Rollover => "rollover",
            Stage::Backup => "backup",
        }
    }
}

/// Removes a regular file. Directories are left alone and count as removed.
pub fn remove_file(path: &Path) -> Result<(), Error> {
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        return Ok(());
    }
    fs::remove_file(path)?;
    Ok(())
}

/// Deletes the oldest artifacts of `base_name` in `dir` until at most
/// `max_kept` remain. A negative `max_kept` keeps everything.
///
/// Ordering is by file name, which is chronological for 17 digit stamps.
/// Short numeric suffixes only order correctly against suffixes of the same
/// width ("10" sorts before "9").
///
/// The first failed delete ends the pass. Returns how many files were removed.
pub fn prune(
    dir: &Path,
    base_name: &str,
    max_kept: i64,
    stage: Stage,
    reporter: &dyn Reporter,
) -> usize {
    if max_kept < 0 {
        return 0;
    }
    let pattern = match stage {
        Stage::Rollover => rollover_pattern(base_name),
        Stage::Backup => backup_pattern(base_name),
    };
    let pattern = match pattern {
        Ok(p) => p,
        Err(e) => {
            reporter.error(&format!(
                "build {} pattern for {} failed: {}",
                stage.as_str(),
                base_name,
                e
            ));
            return 0;
        }
    };
    let mut files = match list_siblings(dir, &pattern, reporter) {
        Ok(files) => files,
        Err(e) => {
            reporter.error(&format!("walk path: {} failed: {}", dir.display(), e));
            return 0;
        }
    };
    files.sort();

    let max_kept = max_kept as usize;
    if files.len() <= max_kept {
        return 0;
    }
    let excess = files.len() - max_kept;
    let mut removed = 0;
    for path in files.iter().take(excess) {
        if let Err(e) = remove_file(path) {
            reporter.error(&format!("remove path: {} failed: {}", path.display(), e));
            break;
        }
        removed += 1;
    }
    removed
}

/// String-staged entry point. Unknown stage names do nothing.
pub fn prune_stage(
    dir: &Path,
    base_name: &str,
    max_kept: i64,
    stage: &str,
    reporter: &dyn Reporter,
) -> usize {
    match Stage::parse(stage) {
        Some(stage) => prune(dir, base_name, max_kept, stage, reporter),
        None => 0,
    }
}
