//! Calendar arithmetic for the ledger.
//!
//! Timestamps are persisted as fixed-width UTC RFC 3339 strings so that
//! lexicographic comparison in SQL matches chronological order. Daily caps
//! and date-range filters are defined over the **local** calendar day; the
//! helpers here convert local day/month windows into UTC bounds.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, SecondsFormat, TimeZone, Utc};

use crate::errors::{LedgerError, Result};

/// Canonical persisted form of an instant.
pub fn timestamp(at: DateTime<Local>) -> String {
    at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a persisted timestamp back into an instant.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::InvalidInput(format!("bad timestamp '{s}': {e}")))
}

/// Start of the given local date as an instant.
fn local_day_start(date: NaiveDate) -> Result<DateTime<Local>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| LedgerError::InvalidInput(format!("bad date '{date}'")))?;
    // earliest() covers DST transitions where midnight is ambiguous or skipped
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| LedgerError::InvalidInput(format!("date '{date}' has no local midnight")))
}

/// Half-open `[start, end)` UTC bounds of the local calendar day containing
/// `at`. Used for daily-cap counting.
pub fn local_day_window(at: DateTime<Local>) -> Result<(String, String)> {
    let date = at.date_naive();
    let start = local_day_start(date)?;
    let end = local_day_start(date + Duration::days(1))?;
    Ok((timestamp(start), timestamp(end)))
}

/// Parse a `YYYY-MM-DD` filter date supplied by a caller.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidInput(format!("bad date '{s}', expected YYYY-MM-DD")))
}

/// Convert optional `[from, to]` filter dates (both inclusive, local days)
/// into optional half-open UTC bounds.
pub fn period_bounds(from: Option<&str>, to: Option<&str>) -> Result<(Option<String>, Option<String>)> {
    let lower = match from {
        Some(s) => Some(timestamp(local_day_start(parse_date(s)?)?)),
        None => None,
    };
    let upper = match to {
        Some(s) => Some(timestamp(local_day_start(parse_date(s)? + Duration::days(1))?)),
        None => None,
    };
    Ok((lower, upper))
}

/// Half-open UTC bounds of one local calendar month.
pub fn month_window(year: i32, month: u32) -> Result<(String, String)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| LedgerError::InvalidInput(format!("bad month {year}-{month}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| LedgerError::InvalidInput(format!("bad month {year}-{month}")))?;
    Ok((timestamp(local_day_start(first)?), timestamp(local_day_start(next)?)))
}

/// The (year, month) immediately preceding the local month containing `at`.
pub fn previous_month(at: DateTime<Local>) -> (i32, u32) {
    if at.month() == 1 {
        (at.year() - 1, 12)
    } else {
        (at.year(), at.month() - 1)
    }
}
