//! Timestamp helpers shared by services.
//!
//! Wire timestamps are RFC 3339 in UTC. Inputs additionally accept a naive
//! `YYYY-MM-DDTHH:MM[:SS]` form, read as UTC.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

#[must_use]
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// RFC 3339 rendering. Falls back to the unix timestamp if formatting fails.
#[must_use]
pub fn iso(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

#[must_use]
pub fn now_iso() -> String {
    iso(now_utc())
}

/// Parse RFC 3339, or a naive datetime with optional seconds (UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(raw, &with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(raw, &without_seconds))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}
