//! Catalogue of queryable variables and how each is derived from raw daily columns.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    climo::series::{DailySeries, RawDaily},
    error::ClimoError,
};

/// Metres per second to miles per hour.
pub const MS_TO_MPH: f64 = 2.23694;

/// Gust proxy factor applied to mean wind; the provider has no gust observation.
pub const GUST_FACTOR: f64 = 1.6;

/// Supported variables for PoE queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    #[serde(rename = "precip_mm_day")]
    PrecipMmDay,
    #[serde(rename = "precip_mm_hr")]
    PrecipMmHr,
    #[serde(rename = "wind_mph")]
    WindMph,
    #[serde(rename = "gust_mph")]
    GustMph,
    #[serde(rename = "rh_pct")]
    RhPct,
    #[serde(rename = "tmaxF")]
    TmaxF,
    #[serde(rename = "tminF")]
    TminF,
    #[serde(rename = "heatindex_F")]
    HeatIndexF,
}

impl Variable {
    pub const ALL: [Variable; 8] = [
        Variable::PrecipMmDay,
        Variable::PrecipMmHr,
        Variable::WindMph,
        Variable::GustMph,
        Variable::RhPct,
        Variable::TmaxF,
        Variable::TminF,
        Variable::HeatIndexF,
    ];

    /// Wire name of the variable.
    pub fn name(self) -> &'static str {
        match self {
            Variable::PrecipMmDay => "precip_mm_day",
            Variable::PrecipMmHr => "precip_mm_hr",
            Variable::WindMph => "wind_mph",
            Variable::GustMph => "gust_mph",
            Variable::RhPct => "rh_pct",
            Variable::TmaxF => "tmaxF",
            Variable::TminF => "tminF",
            Variable::HeatIndexF => "heatindex_F",
        }
    }

    pub fn units(self) -> &'static str {
        match self {
            Variable::PrecipMmDay => "mm/day",
            Variable::PrecipMmHr => "mm/hr",
            Variable::WindMph | Variable::GustMph => "mph",
            Variable::RhPct => "%",
            Variable::TmaxF | Variable::TminF | Variable::HeatIndexF => "°F",
        }
    }

    /// Histogram edges used when a metric does not override them.
    pub fn default_bins(self) -> &'static [f64] {
        match self {
            Variable::PrecipMmDay => &[0.0, 1.0, 5.0, 10.0, 15.0, 25.0, 50.0],
            Variable::PrecipMmHr => &[0.0, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0],
            Variable::WindMph => &[0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 35.0, 50.0],
            Variable::GustMph => &[0.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 45.0, 60.0],
            Variable::RhPct => &[20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0],
            Variable::TmaxF => &[60.0, 70.0, 80.0, 85.0, 90.0, 95.0, 100.0, 105.0],
            Variable::TminF => &[-10.0, 0.0, 10.0, 20.0, 32.0, 40.0, 50.0, 60.0],
            Variable::HeatIndexF => &[70.0, 80.0, 85.0, 90.0, 95.0, 100.0, 105.0],
        }
    }

    /// Derive this variable as a daily series on the raw frame's index.
    pub fn derive(self, raw: &RawDaily) -> DailySeries {
        match self {
            // a day without a precipitation report counts as a dry day
            Variable::PrecipMmDay => raw.column(|row| Some(row.pr_mm.unwrap_or(0.0))),
            Variable::PrecipMmHr => raw.column(|row| Some(row.pr_mm.unwrap_or(0.0) / 24.0)),
            Variable::WindMph => raw.column(|row| row.ws_ms).map(ms_to_mph),
            Variable::GustMph => raw
                .column(|row| row.ws_ms)
                .map(|ms| ms_to_mph(ms) * GUST_FACTOR),
            Variable::RhPct => raw.column(|row| row.rh).map(clamp_rh),
            Variable::TmaxF => raw.column(|row| row.tmax_c).map(c_to_f),
            Variable::TminF => raw.column(|row| row.tmin_c).map(c_to_f),
            Variable::HeatIndexF => {
                let tmax_f = raw.column(|row| row.tmax_c).map(c_to_f);
                let rh = raw.column(|row| row.rh).map(clamp_rh);
                tmax_f.zip_with(&rh, heat_index_f)
            }
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = ClimoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| ClimoError::UnsupportedVariable(s.to_string()))
    }
}

pub fn c_to_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn ms_to_mph(ms: f64) -> f64 {
    ms * MS_TO_MPH
}

fn clamp_rh(rh: f64) -> f64 {
    rh.clamp(0.0, 100.0)
}

/// NWS Rothfusz heat index regression in °F.
///
/// Below 80 °F the air temperature is returned unchanged. The low- and high-humidity
/// adjustments only apply inside their temperature bands.
pub fn heat_index_f(temp_f: f64, rh: f64) -> f64 {
    if temp_f < 80.0 {
        return temp_f;
    }
    const C1: f64 = -42.379;
    const C2: f64 = 2.04901523;
    const C3: f64 = 10.14333127;
    const C4: f64 = -0.22475541;
    const C5: f64 = -0.00683783;
    const C6: f64 = -0.05481717;
    const C7: f64 = 0.00122874;
    const C8: f64 = 0.00085282;
    const C9: f64 = -0.00000199;

    let t = temp_f;
    let r = rh;
    let mut hi = C1
        + C2 * t
        + C3 * r
        + C4 * t * r
        + C5 * t * t
        + C6 * r * r
        + C7 * t * t * r
        + C8 * t * r * r
        + C9 * t * t * r * r;

    if r < 13.0 && (80.0..=112.0).contains(&t) {
        hi -= ((13.0 - r) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
    }
    if r > 85.0 && (80.0..=87.0).contains(&t) {
        hi += 0.02 * (r - 85.0) * (87.0 - t);
    }
    hi
}
