//! Generic multi-metric probability-of-exceedance query.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    climo::{compute_generic_poe, BinSpec, Metric, Op, PoeResult, Variable},
    corridor::{timebins::parse_target_date, GeoPoint},
    data::Providers,
    error::{ClimoError, Result},
};

pub const DEFAULT_WINDOW_DAYS: i64 = 14;
pub const MAX_WINDOW_DAYS: i64 = 60;
/// Largest automatic bin count accepted in a metric override.
pub const MAX_AUTO_BINS: usize = 1_000;

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

/// One metric as sent by a caller; the variable and operator are validated on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub var: String,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<BinSpec>,
}

impl MetricSpec {
    fn to_metric(&self) -> Result<Metric> {
        let variable: Variable = self.var.parse()?;
        let op = match &self.op {
            Some(raw) => raw.trim().to_ascii_lowercase().parse()?,
            None => Op::default(),
        };
        if !self.threshold.is_finite() {
            return Err(ClimoError::InvalidRequest(format!(
                "threshold for {variable} must be finite"
            )));
        }
        if let Some(bins) = &self.bins {
            validate_bins(variable, bins)?;
        }
        Ok(Metric {
            variable,
            threshold: self.threshold,
            op,
            bins: self.bins.clone(),
        })
    }
}

fn validate_bins(variable: Variable, bins: &BinSpec) -> Result<()> {
    match bins {
        BinSpec::Edges(edges) => {
            let ascending = edges.windows(2).all(|pair| pair[0] < pair[1]);
            if edges.len() < 2 || !ascending || edges.iter().any(|e| !e.is_finite()) {
                return Err(ClimoError::InvalidRequest(format!(
                    "bins for {variable} must be at least two finite, strictly ascending edges"
                )));
            }
        }
        BinSpec::Auto(count) if *count == 0 || *count > MAX_AUTO_BINS => {
            return Err(ClimoError::InvalidRequest(format!(
                "bin count for {variable} must be between 1 and {MAX_AUTO_BINS}"
            )));
        }
        BinSpec::Auto(_) => {}
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoeRequest {
    pub lat: f64,
    pub lon: f64,
    /// `YYYY-MM-DD` or an ISO 8601 timestamp; only the calendar date is used.
    pub date: String,
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    pub metrics: Vec<MetricSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub lat: f64,
    pub lon: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoeMeta {
    pub mode: String,
    pub window_days: u32,
    pub half_width_days: u32,
    /// Pool size of the first requested metric.
    pub samples: usize,
    pub sources: Vec<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoeResponse {
    pub results: IndexMap<Variable, PoeResult>,
    pub meta: PoeMeta,
}

impl PoeRequest {
    /// Validate everything that does not need upstream data.
    pub fn validate(&self) -> Result<(NaiveDate, u32, Vec<Metric>)> {
        if self.metrics.is_empty() {
            return Err(ClimoError::InvalidRequest(
                "metrics must contain at least one entry".to_string(),
            ));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(ClimoError::InvalidRequest(format!(
                "window_days must be between 1 and {MAX_WINDOW_DAYS}, got {}",
                self.window_days
            )));
        }
        let date = parse_target_date(&self.date)?;
        let metrics = self
            .metrics
            .iter()
            .map(MetricSpec::to_metric)
            .collect::<Result<Vec<_>>>()?;
        Ok((date, self.window_days as u32, metrics))
    }
}

/// Fetch the point's series and summarise every metric over the DOY window around `date`.
#[instrument(skip(providers, request), fields(lat = request.lat, lon = request.lon, date = %request.date))]
pub async fn run_poe(providers: &Providers, request: &PoeRequest) -> Result<PoeResponse> {
    let (date, window_days, metrics) = request.validate()?;
    let point = GeoPoint::new(request.lon, request.lat);
    let raw = providers.fetch(point).await?;
    let batch = compute_generic_poe(&raw, date, window_days, &metrics);
    info!(
        metrics = batch.results.len(),
        samples = batch.samples,
        rows = raw.len(),
        "computed climatology PoE"
    );

    Ok(PoeResponse {
        results: batch.results,
        meta: PoeMeta {
            mode: "climatology".to_string(),
            window_days,
            half_width_days: window_days / 2,
            samples: batch.samples,
            sources: providers.sources(),
            provenance: Provenance {
                lat: request.lat,
                lon: request.lon,
                date,
            },
        },
    })
}
