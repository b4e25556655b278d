// src/rotation/matcher.rs
use crate::rotation::reporter::Reporter;
use crate::Error;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Active log files picked up by a directory pass: `*.log`, `*.trace`, `*.out`.
pub const ACTIVE_LOG_PATTERN: &str = r"^.+\.(log|trace|out)$";

/// Rollover copies of `base_name`: `<base>.<1-17 digits>`.
pub fn rollover_pattern(base_name: &str) -> Result<Regex, Error> {
    Ok(Regex::new(&format!(
        r"^{}\.[0-9]{{1,17}}$",
        regex::escape(base_name)
    ))?)
}

/// Rollover copies whose suffix is already a canonical timestamp.
pub fn timestamped_rollover_pattern(base_name: &str) -> Result<Regex, Error> {
    Ok(Regex::new(&format!(
        r"^{}\.[0-9]{{17}}$",
        regex::escape(base_name)
    ))?)
}

/// Compressed backups of `base_name`: `<base>.<17 digits>.zip`.
pub fn backup_pattern(base_name: &str) -> Result<Regex, Error> {
    Ok(Regex::new(&format!(
        r"^{}\.[0-9]{{17}}\.zip$",
        regex::escape(base_name)
    ))?)
}

/// Lists files under `dir` (recursively) whose file name matches `pattern`.
/// Regular files and symlinks to regular files are returned, directories
/// never are. Entries come back in file-name order per directory.
///
/// Only a failure to read `dir` itself is an error. Entries below it that
/// cannot be read are reported and skipped.
pub fn list_files<P: AsRef<Path>>(
    dir: P,
    pattern: &Regex,
    reporter: &dyn Reporter,
) -> Result<Vec<PathBuf>, Error> {
    walk(WalkDir::new(dir.as_ref()), pattern, reporter)
}

/// Like `list_files`, but only looks at the immediate children of `dir`.
/// Rotated artifacts always sit next to their active file, so the backup and
/// retention stages use this.
pub fn list_siblings<P: AsRef<Path>>(
    dir: P,
    pattern: &Regex,
    reporter: &dyn Reporter,
) -> Result<Vec<PathBuf>, Error> {
    walk(WalkDir::new(dir.as_ref()).max_depth(1), pattern, reporter)
}

fn is_regular_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink() && fs::metadata(entry.path()).map_or(false, |m| m.is_file())
}

fn walk(walker: WalkDir, pattern: &Regex, reporter: &dyn Reporter) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::with_capacity(10);
    for entry_res in walker.sort_by_file_name() {
        let entry = match entry_res {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                reporter.error(&format!("skip unreadable entry: {}", e));
                continue;
            }
        };
        if !is_regular_file(&entry) {
            continue;
        }
        let matched = entry
            .file_name()
            .to_str()
            .map_or(false, |name| pattern.is_match(name));
        if matched {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
