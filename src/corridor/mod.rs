//! Event-Corridor aggregation: EVS over every sample point × daily bin, summarised per bin.

pub mod geometry;
pub mod store;
pub mod timebins;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::evs::{ClimatologyComposer, Evs, FactorSeries};

pub use geometry::{GeoPoint, Geometry, GeometryMode};
pub use store::EventStore;

/// Default score a cell must reach to count towards coverage.
pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 70.0;

/// EVS of one cell at time index `t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEvs {
    pub t: usize,
    #[serde(flatten)]
    pub evs: Evs,
}

/// One sample point and its score sequence, aligned to the corridor's time bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCell {
    pub cell_id: usize,
    pub lon: f64,
    pub lat: f64,
    pub evs: Vec<TimedEvs>,
}

/// Cross-point summary of one time bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub t: usize,
    /// Fraction of cells scoring at or above the coverage threshold.
    pub coverage: f64,
    pub mean: f64,
    pub min: f64,
}

/// Score every point on every day with the climatology composer.
pub fn score_cells(
    points: &[(GeoPoint, &FactorSeries)],
    days: &[NaiveDate],
    composer: &ClimatologyComposer,
) -> Vec<EventCell> {
    points
        .iter()
        .enumerate()
        .map(|(cell_id, (point, series))| EventCell {
            cell_id,
            lon: point.lon,
            lat: point.lat,
            evs: days
                .iter()
                .enumerate()
                .map(|(t, day)| TimedEvs {
                    t,
                    evs: composer.score_day(series, *day),
                })
                .collect(),
        })
        .collect()
}

/// Per-bin coverage, mean and minimum across cells.
///
/// Cells with fewer scores than bins are skipped for the bins they lack; a bin with no scores
/// at all reports zeros.
pub fn aggregate(cells: &[EventCell], bin_count: usize, threshold: f64) -> Vec<Aggregate> {
    (0..bin_count)
        .map(|t| {
            let scores: Vec<f64> = cells
                .iter()
                .filter_map(|cell| cell.evs.get(t).map(|timed| timed.evs.total))
                .collect();
            if scores.is_empty() {
                return Aggregate {
                    t,
                    coverage: 0.0,
                    mean: 0.0,
                    min: 0.0,
                };
            }
            let n = scores.len() as f64;
            let covered = scores.iter().filter(|s| **s >= threshold).count();
            Aggregate {
                t,
                coverage: covered as f64 / n,
                mean: scores.iter().sum::<f64>() / n,
                min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            }
        })
        .collect()
}

/// Index of the first bin with the highest mean; 0 when there are no bins.
pub fn best_time_index(aggregates: &[Aggregate]) -> usize {
    let mut best = 0;
    for (idx, agg) in aggregates.iter().enumerate() {
        if agg.mean > aggregates[best].mean {
            best = idx;
        }
    }
    best
}

/// Provenance carried alongside a corridor result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorMeta {
    pub units: IndexMap<String, String>,
    pub sources: Vec<String>,
    pub notes: String,
    pub coverage_threshold: f64,
    pub climo_window_days: u32,
    pub coerced_to_daily: bool,
    pub best_time_iso: Option<String>,
}

/// Complete corridor result as returned to callers and kept for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorReport {
    pub event_id: String,
    pub times: Vec<String>,
    pub cells: Vec<EventCell>,
    pub aggregates: Vec<Aggregate>,
    pub best_time_index: usize,
    pub meta: CorridorMeta,
}
