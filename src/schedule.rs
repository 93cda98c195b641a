//! Schedule body for `PUT /items1/{item_id}`
//!
//! Accepted input forms:
//! - datetimes: RFC 3339 (`2024-05-01T10:00:00+02:00`, `...Z`), naive ISO
//!   (`2024-05-01T10:00:00`, taken as UTC) or Unix seconds
//! - times of day: `HH:MM[:SS[.ffffff]]`
//! - durations: seconds (number or numeric string), `[-]HH:MM:SS[.f]`, or
//!   ISO 8601 `P[nD][T[nH][nM][nS]]`

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta};
use serde_json::Value;

use crate::http::{ApiError, ValidationIssue};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub start_datetime: Option<DateTime<FixedOffset>>,
    pub end_datetime: Option<DateTime<FixedOffset>>,
    pub repeat_at: Option<NaiveTime>,
    pub process_after: Option<TimeDelta>,
}

impl Schedule {
    /// Read the four optional fields from a JSON object body.
    ///
    /// Absent and `null` fields are `None`. Every malformed field is
    /// reported.
    pub fn from_body(body: &Value) -> Result<Self, ApiError> {
        let mut issues = Vec::new();

        let schedule = Self {
            start_datetime: field(body, "start_datetime", "datetime", parse_datetime, &mut issues),
            end_datetime: field(body, "end_datetime", "datetime", parse_datetime, &mut issues),
            repeat_at: field(body, "repeat_at", "time", parse_time, &mut issues),
            process_after: field(body, "process_after", "duration", parse_duration, &mut issues),
        };

        if issues.is_empty() {
            Ok(schedule)
        } else {
            Err(ApiError::Validation(issues))
        }
    }

    /// `start_datetime + process_after`, when both are known
    pub fn start_process(&self) -> Option<DateTime<FixedOffset>> {
        let start = self.start_datetime?;
        start.checked_add_signed(self.process_after?)
    }

    /// `end_datetime - start_process`, when both are known
    pub fn duration(&self) -> Option<TimeDelta> {
        Some(self.end_datetime? - self.start_process()?)
    }
}

/// Parse an optional body field, recording a `value_error.<kind>` on failure
fn field<T>(
    body: &Value,
    name: &str,
    kind: &str,
    parse: fn(&Value) -> Option<T>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<T> {
    let raw = body.get(name).filter(|v| !v.is_null())?;
    let parsed = parse(raw);
    if parsed.is_none() {
        issues.push(ValidationIssue::new(
            ["body", name],
            format!("invalid {kind} format"),
            format!("value_error.{kind}"),
        ));
    }
    parsed
}

pub fn parse_datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            #[allow(clippy::cast_possible_truncation)]
            let micros = (secs * 1_000_000.0).round() as i64;
            DateTime::from_timestamp_micros(micros).map(|d| d.fixed_offset())
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt);
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc().fixed_offset())
        }
        _ => None,
    }
}

pub fn parse_time(value: &Value) -> Option<NaiveTime> {
    let s = value.as_str()?.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

pub fn parse_duration(value: &Value) -> Option<TimeDelta> {
    let seconds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_duration_str(s.trim())?,
        _ => return None,
    };
    // Keep well inside TimeDelta's range
    if !seconds.is_finite() || seconds.abs() > 1e14 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let micros = (seconds * 1_000_000.0).round() as i64;
    Some(TimeDelta::microseconds(micros))
}

fn parse_duration_str(s: &str) -> Option<f64> {
    if let Ok(seconds) = s.parse::<f64>() {
        return Some(seconds);
    }
    if let Some(iso) = s.strip_prefix('P').or_else(|| s.strip_prefix("-P")) {
        let sign = if s.starts_with('-') { -1.0 } else { 1.0 };
        return parse_iso_duration(iso).map(|secs| sign * secs);
    }
    parse_clock_duration(s)
}

/// Body of an ISO 8601 duration after the leading `P`
fn parse_iso_duration(s: &str) -> Option<f64> {
    let (date_part, time_part) = match s.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (s, None),
    };

    let mut total = 0.0;
    let mut any = false;

    for (part, units) in [
        (Some(date_part), &[('W', 604_800.0), ('D', 86_400.0)][..]),
        (time_part, &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)][..]),
    ] {
        let Some(mut rest) = part else { continue };
        for (unit, factor) in units {
            if let Some((number, tail)) = rest.split_once(*unit) {
                total += number.parse::<f64>().ok()? * factor;
                rest = tail;
                any = true;
            }
        }
        if !rest.is_empty() {
            return None;
        }
    }

    if time_part == Some("") || !any {
        return None;
    }
    Some(total)
}

/// `[-][D days, ]HH:MM:SS[.f]` or `MM:SS`
fn parse_clock_duration(s: &str) -> Option<f64> {
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (days, clock) = match s.split_once(' ') {
        Some((days, clock)) => {
            let days = days.parse::<f64>().ok()?;
            let clock = clock
                .trim_start_matches("days,")
                .trim_start_matches("day,")
                .trim();
            (days, clock)
        }
        None => (0.0, s),
    };

    let fields: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, sec] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, sec.parse::<f64>().ok()?),
        [m, sec] => (0.0, m.parse::<f64>().ok()?, sec.parse::<f64>().ok()?),
        _ => return None,
    };

    let total = days * 86_400.0 + hours * 3_600.0 + minutes * 60.0 + seconds;
    Some(if negative { -total } else { total })
}

pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Duration as fractional seconds
#[allow(clippy::cast_precision_loss)]
pub fn total_seconds(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}
