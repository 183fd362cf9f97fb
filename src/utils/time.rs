// src/utils/time.rs

use chrono::{DateTime, Utc};

/// Service for handling time-related operations.
#[derive(Debug, Clone)]
pub struct TimeService;

impl TimeService {
    pub fn new() -> Self {
        TimeService
    }

    /// Gets the current UTC date and time.
    pub fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Gets the current timestamp in milliseconds since Unix epoch.
    pub fn current_timestamp_ms(&self) -> u64 {
        Utc::now().timestamp_millis() as u64
    }
}

impl Default for TimeService {
    fn default() -> Self {
        Self::new()
    }
}

/// Current timestamp in milliseconds since Unix epoch (standalone function).
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Converts a whole number of days to milliseconds, for retention cutoffs.
pub fn days_to_ms(days: u32) -> u64 {
    days as u64 * 24 * 60 * 60 * 1000
}
