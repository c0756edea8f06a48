//! Raw provider columns and derived daily series, both keyed by calendar date.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One day of raw provider columns. `None` marks a missing observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(rename = "tmaxC")]
    pub tmax_c: Option<f64>,
    #[serde(rename = "tminC")]
    pub tmin_c: Option<f64>,
    #[serde(rename = "tavgC")]
    pub tavg_c: Option<f64>,
    pub rh: Option<f64>,
    pub ws_ms: Option<f64>,
    pub pr_mm: Option<f64>,
}

impl RawRow {
    /// Drop NaN cells so they behave exactly like absent observations.
    pub fn cleaned(self) -> Self {
        Self {
            tmax_c: finite(self.tmax_c),
            tmin_c: finite(self.tmin_c),
            tavg_c: finite(self.tavg_c),
            rh: finite(self.rh),
            ws_ms: finite(self.ws_ms),
            pr_mm: finite(self.pr_mm),
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Merged raw columns for one point on a shared, unique, ordered date index.
///
/// Days the provider did not report are simply absent from the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDaily {
    rows: BTreeMap<NaiveDate, RawRow>,
}

impl RawDaily {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, row: RawRow) {
        self.rows.insert(date, row.cleaned());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&RawRow> {
        self.rows.get(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &RawRow)> + '_ {
        self.rows.iter().map(|(date, row)| (*date, row))
    }

    /// First and last calendar year present, if any.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let first = self.rows.keys().next()?;
        let last = self.rows.keys().next_back()?;
        Some((first.year(), last.year()))
    }

    /// Project one raw column onto the shared index.
    pub fn column<F>(&self, pick: F) -> DailySeries
    where
        F: Fn(&RawRow) -> Option<f64>,
    {
        self.rows
            .iter()
            .map(|(date, row)| (*date, pick(row)))
            .collect()
    }

    /// Replace `pr_mm` with the secondary precipitation series on every date it covers.
    ///
    /// Dates the secondary series lacks keep the primary value. Returns the number of days
    /// overridden.
    pub fn override_precip(&mut self, precip: &DailySeries) -> usize {
        let mut overridden = 0;
        for (date, row) in self.rows.iter_mut() {
            if let Some(value) = precip.get(*date) {
                row.pr_mm = Some(value);
                overridden += 1;
            }
        }
        overridden
    }
}

impl FromIterator<(NaiveDate, RawRow)> for RawDaily {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, RawRow)>>(iter: I) -> Self {
        let mut raw = RawDaily::new();
        for (date, row) in iter {
            raw.insert(date, row);
        }
        raw
    }
}

/// An ordered mapping from calendar date to a value or to "no observation that day".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    values: BTreeMap<NaiveDate, Option<f64>>,
}

impl DailySeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observed value on `date`; `None` for both missing days and days off the index.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.values.iter().map(|(date, value)| (*date, *value))
    }

    /// Number of days carrying an observation.
    pub fn observed(&self) -> usize {
        self.values.values().filter(|v| v.is_some()).count()
    }

    /// Apply `f` to every observed value; missing days stay missing.
    pub fn map<F>(&self, f: F) -> DailySeries
    where
        F: Fn(f64) -> f64,
    {
        self.iter().map(|(date, value)| (date, value.map(&f))).collect()
    }

    /// Combine two aligned series pointwise; a day missing in either input is missing in the
    /// output.
    pub fn zip_with<F>(&self, other: &DailySeries, f: F) -> DailySeries
    where
        F: Fn(f64, f64) -> f64,
    {
        self.iter()
            .map(|(date, left)| {
                let right = other.get(date);
                let combined = match (left, right) {
                    (Some(l), Some(r)) => Some(f(l, r)),
                    _ => None,
                };
                (date, combined)
            })
            .collect()
    }
}

impl FromIterator<(NaiveDate, Option<f64>)> for DailySeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Option<f64>)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(date, value)| (date, finite(value)))
                .collect(),
        }
    }
}
