//! Timestamp helpers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// A UTC timestamp.
pub type Timestamp = DateTime<Utc>;

/// Display format for bar and pattern timestamps.
pub const BAR_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returns the current UTC time as an ISO 8601 string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a bar timestamp as `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn format_bar_time(ts: &NaiveDateTime) -> String {
    ts.format(BAR_TIME_FORMAT).to_string()
}

/// The opening bell of the simulated session: 2023-10-27 09:30:00.
#[must_use]
pub fn session_open() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 10, 27)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default()
}
