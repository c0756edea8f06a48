//! Empirical exceedance statistics over a pooled sample.

use std::{cmp::Ordering, str::FromStr};

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    climo::{
        pool::{pool, PoolingWindow},
        series::RawDaily,
        variables::Variable,
    },
    error::ClimoError,
};

/// Number of thresholds in the exceedance curve sweep.
pub const CURVE_POINTS: usize = 40;
const CURVE_Q_LOW: f64 = 0.02;
const CURVE_Q_HIGH: f64 = 0.98;

/// Comparison applied between a sample and the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// `value >= threshold`
    #[default]
    Ge,
    /// `value <= threshold`
    Le,
}

impl Op {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Op::Ge => value >= threshold,
            Op::Le => value <= threshold,
        }
    }
}

impl FromStr for Op {
    type Err = ClimoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ge" | ">=" => Ok(Op::Ge),
            "le" | "<=" => Ok(Op::Le),
            other => Err(ClimoError::InvalidRequest(format!(
                "op must be 'ge' or 'le', got '{other}'"
            ))),
        }
    }
}

/// Histogram binning: explicit edges, or an automatic equal-width bin count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinSpec {
    Edges(Vec<f64>),
    Auto(usize),
}

/// One PoE query unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub variable: Variable,
    pub threshold: f64,
    pub op: Op,
    pub bins: Option<BinSpec>,
}

impl Metric {
    pub fn new(variable: Variable, threshold: f64, op: Op) -> Self {
        Self {
            variable,
            threshold,
            op,
            bins: None,
        }
    }

    fn bin_spec(&self) -> BinSpec {
        self.bins
            .clone()
            .unwrap_or_else(|| BinSpec::Edges(self.variable.default_bins().to_vec()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<f64>,
    pub pdf: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cdf {
    pub x: Vec<f64>,
    #[serde(rename = "F")]
    pub f: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoeCurve {
    pub thresholds: Vec<f64>,
    pub poe: Vec<f64>,
}

/// Full empirical summary for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoeResult {
    pub poe: f64,
    pub hist: Histogram,
    pub cdf: Cdf,
    pub poe_curve: PoeCurve,
    pub units: String,
    /// Pool size behind this result.
    pub samples: usize,
}

/// Fraction of the pool satisfying the comparison, or `None` for an empty pool.
pub fn exceedance_fraction(pool: &[f64], threshold: f64, op: Op) -> Option<f64> {
    if pool.is_empty() {
        return None;
    }
    let hits = pool.iter().filter(|v| op.holds(**v, threshold)).count();
    Some(hits as f64 / pool.len() as f64)
}

/// Point exceedance probability; an empty pool reports 0.0.
pub fn exceedance_probability(pool: &[f64], threshold: f64, op: Op) -> f64 {
    exceedance_fraction(pool, threshold, op).unwrap_or(0.0)
}

/// Normalised histogram of the pool.
///
/// Bins are half-open `[e_i, e_i+1)` except the last, which is closed. Values below the first
/// edge fall into the first bin and values above the last edge into the last bin, so densities
/// sum to one for any non-empty pool.
pub fn histogram(pool: &[f64], spec: &BinSpec) -> Histogram {
    let edges = match spec {
        BinSpec::Edges(edges) => edges.clone(),
        BinSpec::Auto(_) if pool.is_empty() => Vec::new(),
        BinSpec::Auto(count) => auto_edges(pool, (*count).max(1)),
    };
    let bin_count = edges.len().saturating_sub(1);
    let mut counts = vec![0usize; bin_count];
    if bin_count > 0 {
        for value in pool {
            let upper = edges.partition_point(|edge| edge <= value);
            let idx = upper.saturating_sub(1).min(bin_count - 1);
            counts[idx] += 1;
        }
    }
    let total: usize = counts.iter().sum();
    let pdf = counts
        .iter()
        .map(|c| {
            if total == 0 {
                0.0
            } else {
                *c as f64 / total as f64
            }
        })
        .collect();
    Histogram { bins: edges, pdf }
}

fn auto_edges(pool: &[f64], count: usize) -> Vec<f64> {
    let mut low = pool.iter().copied().fold(f64::INFINITY, f64::min);
    let mut high = pool.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if low == high {
        low -= 0.5;
        high += 0.5;
    }
    let step = (high - low) / count as f64;
    (0..=count)
        .map(|i| if i == count { high } else { low + step * i as f64 })
        .collect()
}

/// Sorted pool paired with `rank / n` cumulative fractions.
pub fn empirical_cdf(pool: &[f64]) -> Cdf {
    let x = sorted(pool);
    let n = x.len() as f64;
    let f = (1..=x.len()).map(|rank| rank as f64 / n).collect();
    Cdf { x, f }
}

/// Linearly interpolated quantile of an ascending sample.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = q.clamp(0.0, 1.0) * last as f64;
    let lo = position.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = position - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Exceedance probability evaluated at the pool's 2%..98% quantiles.
pub fn exceedance_curve(pool: &[f64], op: Op) -> PoeCurve {
    if pool.is_empty() {
        return PoeCurve {
            thresholds: Vec::new(),
            poe: Vec::new(),
        };
    }
    let ascending = sorted(pool);
    let step = (CURVE_Q_HIGH - CURVE_Q_LOW) / (CURVE_POINTS - 1) as f64;
    let thresholds: Vec<f64> = (0..CURVE_POINTS)
        .filter_map(|i| quantile(&ascending, CURVE_Q_LOW + step * i as f64))
        .collect();
    let poe = thresholds
        .iter()
        .map(|t| exceedance_probability(pool, *t, op))
        .collect();
    PoeCurve { thresholds, poe }
}

fn sorted(pool: &[f64]) -> Vec<f64> {
    let mut values = pool.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values
}

/// Summarise an already pooled sample for one metric.
pub fn summarize(pool: &[f64], metric: &Metric) -> PoeResult {
    let clean: Vec<f64> = pool.iter().copied().filter(|v| !v.is_nan()).collect();
    PoeResult {
        poe: exceedance_probability(&clean, metric.threshold, metric.op),
        hist: histogram(&clean, &metric.bin_spec()),
        cdf: empirical_cdf(&clean),
        poe_curve: exceedance_curve(&clean, metric.op),
        units: metric.variable.units().to_string(),
        samples: clean.len(),
    }
}

/// Results of one multi-metric request.
#[derive(Debug, Clone, PartialEq)]
pub struct PoeBatch {
    /// Keyed by variable in request order; a repeated variable keeps the last metric's result.
    pub results: IndexMap<Variable, PoeResult>,
    /// Pool size of the first metric's variable.
    pub samples: usize,
}

/// Run every metric against the same pooling window.
pub fn compute_generic_poe(
    raw: &RawDaily,
    target: NaiveDate,
    window_days: u32,
    metrics: &[Metric],
) -> PoeBatch {
    let window = PoolingWindow::from_window_days(target, window_days);
    let mut results = IndexMap::new();
    let mut samples = None;
    for metric in metrics {
        let sample = pool(&metric.variable.derive(raw), &window);
        debug!(variable = %metric.variable, pooled = sample.len(), "pooled metric");
        let result = summarize(&sample, metric);
        samples.get_or_insert(result.samples);
        results.insert(metric.variable, result);
    }
    PoeBatch {
        results,
        samples: samples.unwrap_or(0),
    }
}
