//! Small utility functions used across the crate
//!
//! Clock helpers live here so every tier agrees on the time base:
//! epoch milliseconds for expirations, RFC 3339 for document stamps.

use chrono::{SecondsFormat, Utc};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as an RFC 3339 string with millisecond precision
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Expiration instant `ttl_hours` from `now` (epoch ms)
pub fn expiration_from(now: i64, ttl_hours: u32) -> i64 {
    now + i64::from(ttl_hours) * 3_600 * 1_000
}
