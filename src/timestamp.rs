//! Epoch normalization for browser timestamps.
//!
//! Three epochs coexist on disk: WebKit/Chromium microseconds since
//! 1601-01-01, Unix seconds, and Unix microseconds (Firefox places and
//! bookmarks). Every conversion in the codebase goes through the named
//! constructors here; no call site does arithmetic on raw epoch integers.

use chrono::{DateTime, Utc};

/// Microseconds between 1601-01-01 and 1970-01-01.
const WEBKIT_TO_UNIX_US: i64 = 11_644_473_600_000_000;

pub fn from_webkit_us(t: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(t - WEBKIT_TO_UNIX_US).unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn from_unix_s(t: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(t, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn from_unix_us(t: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(t).unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn from_unix_ms(t: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t).unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn to_webkit_us(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros() + WEBKIT_TO_UNIX_US
}

pub fn to_unix_s(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

pub fn to_unix_us(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros()
}

/// Chromium's `logins.date_created` is Unix seconds in old profiles and
/// WebKit microseconds in newer ones. A raw value beyond "now" read as
/// Unix seconds cannot be a Unix timestamp, so it is taken as WebKit.
pub fn from_chromium_date_created(raw: i64) -> DateTime<Utc> {
    resolve_chromium_date_created(raw, Utc::now().timestamp())
}

fn resolve_chromium_date_created(raw: i64, now_unix_s: i64) -> DateTime<Utc> {
    if raw > now_unix_s {
        from_webkit_us(raw)
    } else {
        from_unix_s(raw)
    }
}
