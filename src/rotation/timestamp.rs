// src/rotation/timestamp.rs
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Width of a canonical rotation timestamp: YYYYMMDDhhmmssmmm.
pub const TIMESTAMP_WIDTH: usize = 17;

// Last millisecond handed out by `next_timestamp`, used to keep stamps
// strictly increasing within the process.
static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Formats a point in time as the 17 digit rotation suffix.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d%H%M%S%3f").to_string()
}

/// Returns a fresh timestamp for a rollover copy or an archive name.
///
/// Stamps are in UTC so they keep sorting in time order across DST changes.
///
/// Two calls within the same millisecond would yield the same name and the
/// second artifact would overwrite the first, so a call that lands on or
/// before the previous millisecond is bumped one millisecond forward.
pub fn next_timestamp() -> String {
    let now = Utc::now().timestamp_millis();
    let mut prev = LAST_MILLIS.load(Ordering::Relaxed);
    let millis = loop {
        let candidate = if now > prev { now } else { prev + 1 };
        match LAST_MILLIS.compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => break candidate,
            Err(actual) => prev = actual,
        }
    };
    match Utc.timestamp_millis_opt(millis).single() {
        Some(at) => format_timestamp(&at),
        None => format_timestamp(&Utc::now()),
    }
}

/// True when `suffix` is exactly a canonical timestamp (17 ASCII digits).
pub fn is_canonical(suffix: &str) -> bool {
    suffix.len() == TIMESTAMP_WIDTH && suffix.bytes().all(|b| b.is_ascii_digit())
}
