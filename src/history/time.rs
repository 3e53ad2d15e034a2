//! Display timestamps and their conversion to the epoch sort key.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Format used when the store generates a display string itself.
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Local-time formats accepted from callers, besides RFC 3339.
const ACCEPTED_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y, %I:%M:%S %p",
];

/// Current local time as a display string.
pub fn now_display() -> String {
    Local::now().format(DISPLAY_FORMAT).to_string()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse a caller-supplied display timestamp into epoch milliseconds.
///
/// Naive formats are interpreted in the local time zone. Returns `None` when the
/// string matches no accepted format or names a local time that does not exist.
pub fn parse_display(display: &str) -> Option<i64> {
    let display = display.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(display) {
        return Some(dt.timestamp_millis());
    }
    ACCEPTED_FORMATS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(display, fmt).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    })
}
