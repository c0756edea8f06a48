//! Time-bin enumeration for corridor requests, coerced to daily resolution.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::error::{ClimoError, Result};

pub const MINUTES_PER_DAY: i64 = 1440;
/// Upper bound on bins enumerated for one request.
pub const MAX_BINS: i64 = 10_000;

/// Parse an ISO 8601 timestamp. Offsets are honoured; naive values and bare dates are UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ClimoError::InvalidTimeParameters(format!("unparsable timestamp '{raw}'")))
}

/// Calendar date a PoE query targets, taken as written (no timezone conversion).
pub fn parse_target_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.date_naive());
    }
    parse_timestamp(raw)
        .map(|ts| ts.date_naive())
        .map_err(|_| ClimoError::InvalidRequest(format!("unparsable date '{raw}'")))
}

/// `start + k * step` for every whole step that fits in `duration`.
pub fn enumerate_bins(start: &str, duration_min: i64, step_min: i64) -> Result<Vec<DateTime<Utc>>> {
    if duration_min <= 0 || step_min <= 0 {
        return Err(ClimoError::InvalidTimeParameters(format!(
            "duration_min ({duration_min}) and step_min ({step_min}) must be positive"
        )));
    }
    let start = parse_timestamp(start)?;
    let steps = duration_min / step_min;
    if steps == 0 {
        return Err(ClimoError::InvalidTimeParameters(format!(
            "no time bins: duration_min ({duration_min}) is shorter than step_min ({step_min})"
        )));
    }
    if steps > MAX_BINS {
        return Err(ClimoError::InvalidTimeParameters(format!(
            "{steps} time bins requested, at most {MAX_BINS} allowed"
        )));
    }
    (0..steps)
        .map(|k| {
            step_min
                .checked_mul(k)
                .and_then(TimeDelta::try_minutes)
                .and_then(|offset| start.checked_add_signed(offset))
                .ok_or_else(|| {
                    ClimoError::InvalidTimeParameters(format!(
                        "time bin {k} ({step_min} min steps from {start}) is out of range"
                    ))
                })
        })
        .collect()
}

/// Distinct UTC calendar days, ascending.
pub fn unique_days(times: &[DateTime<Utc>]) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = times.iter().map(|t| t.date_naive()).collect();
    days.sort_unstable();
    days.dedup();
    days
}

/// The daily bins a corridor request is scored on.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBins {
    pub days: Vec<NaiveDate>,
    /// Sub-daily steps were collapsed to their containing day.
    pub coerced_to_daily: bool,
}

pub fn daily_bins(start: &str, duration_min: i64, step_min: i64) -> Result<DailyBins> {
    let times = enumerate_bins(start, duration_min, step_min)?;
    Ok(DailyBins {
        days: unique_days(&times),
        coerced_to_daily: step_min < MINUTES_PER_DAY,
    })
}

/// Midnight UTC of `day` in RFC 3339.
pub fn day_iso(day: NaiveDate) -> String {
    day.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc().to_rfc3339())
        .unwrap_or_else(|| day.to_string())
}
