//! Human time expressions to epoch seconds.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, SlackError};

static RELATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smhd])$").expect("valid relative time regex"));
static EPOCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid epoch regex"));

const LOCAL_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const TIME_OF_DAY_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Parses a `--after`/`--before`/`--since` value relative to the current time.
/// An empty value means no filter.
pub fn parse_time_arg(value: &str) -> Result<Option<i64>> {
    parse_time_arg_at(value, Local::now())
}

pub fn parse_time_arg_at(value: &str, now: DateTime<Local>) -> Result<Option<i64>> {
    if value.is_empty() {
        return Ok(None);
    }
    let unrecognized = || SlackError::UnrecognizedFormat(value.to_string());

    if let Some(caps) = RELATIVE_RE.captures(value) {
        let amount: i64 = caps[1].parse().map_err(|_| unrecognized())?;
        let delta = match &caps[2] {
            "s" => TimeDelta::try_seconds(amount),
            "m" => TimeDelta::try_minutes(amount),
            "h" => TimeDelta::try_hours(amount),
            _ => TimeDelta::try_days(amount),
        }
        .ok_or_else(unrecognized)?;
        let then = now.checked_sub_signed(delta).ok_or_else(unrecognized)?;
        return Ok(Some(then.timestamp()));
    }

    if value.len() >= 9 && EPOCH_RE.is_match(value) {
        let seconds = value.split('.').next().unwrap_or(value);
        if let Ok(seconds) = seconds.parse::<i64>() {
            return Ok(Some(seconds));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.timestamp()));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%MZ") {
        return Ok(Some(dt.and_utc().timestamp()));
    }

    for format in LOCAL_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Some(local_epoch(&dt)));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(Some(local_epoch(&date.and_time(NaiveTime::MIN))));
    }

    for format in TIME_OF_DAY_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(value, format) {
            return Ok(Some(local_epoch(&now.date_naive().and_time(time))));
        }
    }

    Err(unrecognized())
}

// a wall-clock time skipped by a DST jump has no local instant; read it as UTC
fn local_epoch(dt: &NaiveDateTime) -> i64 {
    match Local.from_local_datetime(dt).earliest() {
        Some(local) => local.timestamp(),
        None => dt.and_utc().timestamp(),
    }
}
