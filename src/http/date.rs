//! HTTP dates (RFC 1123 `IMF-fixdate`)

use super::{Error, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Format a timestamp as e.g. `Thu, 18 Mar 2021 20:44:30 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Current time as an HTTP date
pub fn now() -> String {
    format_http_date(SystemTime::now())
}

/// Parse an HTTP date
pub fn parse_http_date(value: &str) -> Result<SystemTime> {
    httpdate::parse_http_date(value.trim())
        .map_err(|e| Error::Parse(format!("invalid HTTP date {:?}: {}", value, e)))
}

/// Whole seconds since the epoch; HTTP dates carry no finer precision
fn whole_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Whether `supplied` is the same second as `last_modified` or later.
///
/// Comparing whole seconds orders the same way as comparing year, month,
/// day, hour, minute and second in turn.
pub fn is_not_older(supplied: SystemTime, last_modified: SystemTime) -> bool {
    whole_seconds(supplied) >= whole_seconds(last_modified)
}
