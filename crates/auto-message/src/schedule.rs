//! Consultation start instants.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid consultation time '{0}'")]
    InvalidTime(String),
    #[error("Invalid UTC offset '{0}'")]
    InvalidOffset(String),
    #[error("Consultation instant out of range: {0}")]
    OutOfRange(String),
}

/// `date` at `time` (`"HH:MM"`, seconds ignored) in `offset`, as UTC.
pub fn consultation_instant(
    date: NaiveDate,
    time: &str,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, ScheduleError> {
    let mut parts = time.trim().split(':');
    let (Some(hour), Some(minute)) = (parts.next(), parts.next()) else {
        return Err(ScheduleError::InvalidTime(time.to_string()));
    };
    let hour: u32 = hour
        .trim()
        .parse()
        .map_err(|_| ScheduleError::InvalidTime(time.to_string()))?;
    let minute: u32 = minute
        .trim()
        .parse()
        .map_err(|_| ScheduleError::InvalidTime(time.to_string()))?;
    let time_of_day = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ScheduleError::InvalidTime(time.to_string()))?;

    offset
        .from_local_datetime(&date.and_time(time_of_day))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| ScheduleError::OutOfRange(format!("{} {}", date, time)))
}

/// Parses `+HH:MM`, `-HH:MM`, `+HH` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ScheduleError> {
    let invalid = || ScheduleError::InvalidOffset(raw.to_string());
    let raw_trimmed = raw.trim();
    if raw_trimmed.eq_ignore_ascii_case("z") || raw_trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match raw_trimmed.chars().next() {
        Some('+') => (1, &raw_trimmed[1..]),
        Some('-') => (-1, &raw_trimmed[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
