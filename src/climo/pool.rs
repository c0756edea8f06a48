//! Day-of-year window pooling across every year of a daily series.
//!
//! This is the only pooling primitive in the crate; both the generic PoE engine and the
//! corridor composer go through [`pool`] with an explicit half-width.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::climo::series::DailySeries;

/// Length of the circular day-of-year axis.
const DOY_CYCLE: i64 = 366;

/// Target date plus the half-width, in days, of the pooling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolingWindow {
    pub target: NaiveDate,
    pub half_width: u32,
}

impl PoolingWindow {
    pub fn new(target: NaiveDate, half_width: u32) -> Self {
        Self { target, half_width }
    }

    /// Build from a total window span: `window_days = 14` pools roughly ±7 days.
    pub fn from_window_days(target: NaiveDate, window_days: u32) -> Self {
        Self::new(target, window_days / 2)
    }

    /// Whether a historical date falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        doy_distance(self.target.ordinal(), date.ordinal()) <= self.half_width
    }
}

/// Circular distance between two days of year (1..=366).
pub fn doy_distance(a: u32, b: u32) -> u32 {
    let (a, b) = (i64::from(a), i64::from(b));
    let forward = (a - b).rem_euclid(DOY_CYCLE);
    let backward = (b - a).rem_euclid(DOY_CYCLE);
    // bounded by DOY_CYCLE / 2, always fits
    forward.min(backward) as u32
}

/// Collect every observed value of `series` whose day of year lies within the window.
///
/// Missing days are skipped, so an empty result means no year covered the window.
pub fn pool(series: &DailySeries, window: &PoolingWindow) -> Vec<f64> {
    series
        .iter()
        .filter(|(date, _)| window.contains(*date))
        .filter_map(|(_, value)| value)
        .collect()
}
