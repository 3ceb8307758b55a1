//! Time related utils.

use crate::{Error, Result};
use chrono::Utc;

/// DateTime in UTC, the only time zone signing deals with.
pub type DateTime = chrono::DateTime<Utc>;

/// Create the current time in UTC.
#[inline]
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220313`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO 8601: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse an RFC 3339 timestamp like `2022-03-13T07:20:04Z` into UTC.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc3339(s).map_err(|e| {
        Error::unexpected(format!("parse '{s}' into rfc3339 failed")).with_source(e)
    })?;
    Ok(t.with_timezone(&Utc))
}
