// src/utils/time.rs
//! Wall-clock access and artifact timestamp formatting

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, Utc};

use crate::config::constants::time::{TIMESTAMP_FORMAT, TIMESTAMP_LEN};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Current time as a `YYYYMMDD_HHMMSS` stamp
    fn timestamp(&self) -> String {
        format_timestamp(&self.now())
    }
}

/// System clock using local time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Mock clock for deterministic testing, second resolution
pub struct MockClock {
    current_secs: AtomicI64,
}

impl MockClock {
    pub fn new(initial: NaiveDateTime) -> Self {
        Self {
            current_secs: AtomicI64::new(initial.and_utc().timestamp()),
        }
    }

    /// Parse a `YYYYMMDD_HHMMSS` stamp; falls back to the Unix epoch
    pub fn at(stamp: &str) -> Self {
        Self::new(parse_timestamp(stamp).unwrap_or_default())
    }

    pub fn advance_by(&self, duration: Duration) {
        self.current_secs
            .fetch_add(duration.as_secs() as i64, Ordering::Relaxed);
    }

    pub fn set_time(&self, time: NaiveDateTime) {
        self.current_secs
            .store(time.and_utc().timestamp(), Ordering::Relaxed);
    }
}

impl Clock for MockClock {
    fn now(&self) -> NaiveDateTime {
        let secs = self.current_secs.load(Ordering::Relaxed);
        DateTime::<Utc>::from_timestamp(secs, 0)
            .unwrap_or_default()
            .naive_utc()
    }
}

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Strict parse: exactly eight digits, an underscore, six digits
pub fn parse_timestamp(stamp: &str) -> Option<NaiveDateTime> {
    let bytes = stamp.as_bytes();
    if bytes.len() != TIMESTAMP_LEN || bytes[8] != b'_' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 8 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// `1h 2m 3s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}
