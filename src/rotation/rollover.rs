// src/rotation/rollover.rs
use crate::rotation::reporter::Reporter;
use crate::rotation::retention::{self, Stage};
use crate::rotation::timestamp::next_timestamp;
use crate::Error;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const BYTES_PER_MB: u64 = 1024 * 1024;

fn open_for_write(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

/// Byte-for-byte copy of `src` into a new file at `dst` (mode 0640).
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, Error> {
    let mut input = File::open(src)?;
    let mut output = open_for_write(dst, 0o640)?;
    let copied = io::copy(&mut input, &mut output)?;
    output.sync_all()?;
    Ok(copied)
}

/// True when `path` is larger than `max_size_mb` megabytes.
/// A negative limit disables the size trigger; a stat failure is reported
/// and treated as "no rollover".
pub fn should_rollover(path: &Path, max_size_mb: i64, reporter: &dyn Reporter) -> bool {
    if max_size_mb < 0 {
        return false;
    }
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            reporter.error(&format!("stat path: {} failed: {}", path.display(), e));
            return false;
        }
    };
    metadata.len() > (max_size_mb as u64).saturating_mul(BYTES_PER_MB)
}

/// Copies `path` aside to `<path>.<timestamp>` and truncates it in place once
/// it grows past `max_size_mb`, then prunes raw copies beyond `max_backup_count`.
///
/// Returns the path of the new copy when a rollover happened.
pub fn maybe_rollover(
    path: &Path,
    max_size_mb: i64,
    max_backup_count: i64,
    reporter: &dyn Reporter,
) -> Option<PathBuf> {
    if !should_rollover(path, max_size_mb, reporter) {
        return None;
    }

    let mut rotated = path.as_os_str().to_os_string();
    rotated.push(".");
    rotated.push(next_timestamp());
    let rotated = PathBuf::from(rotated);

    // Without a copy, truncating would drop the content.
    if let Err(e) = copy_file(path, &rotated) {
        reporter.error(&format!("copy path: {} failed: {}", path.display(), e));
        return None;
    }

    // Truncate in place so a writer holding the file open keeps its handle.
    if let Err(e) = open_for_write(path, 0o640) {
        reporter.error(&format!("truncate path: {} failed: {}", path.display(), e));
        return Some(rotated);
    }

    if let (Some(dir), Some(base_name)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) {
        retention::prune(dir, base_name, max_backup_count, Stage::Rollover, reporter);
    }
    Some(rotated)
}
