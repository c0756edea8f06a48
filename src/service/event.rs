//! Event-Corridor query: sample the geometry, score each point per day, aggregate, store.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures::{stream, StreamExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::{
    config::Settings,
    corridor::{
        aggregate, best_time_index,
        geometry::{parse_geometry, sample_points},
        score_cells,
        timebins::{daily_bins, day_iso},
        CorridorMeta, CorridorReport, EventStore, GeoPoint, GeometryMode,
        DEFAULT_COVERAGE_THRESHOLD,
    },
    data::Providers,
    error::{ClimoError, Result},
    evs::{AdverseThresholds, ClimatologyComposer, FactorSeries, FactorWeights, WeightOverrides},
    service::CLIMO_SOURCE_NOTE,
};

pub const DEFAULT_DURATION_MIN: i64 = 120;
pub const DEFAULT_STEP_MIN: i64 = 30;

fn default_duration_min() -> i64 {
    DEFAULT_DURATION_MIN
}

fn default_step_min() -> i64 {
    DEFAULT_STEP_MIN
}

fn default_evs_min() -> f64 {
    DEFAULT_COVERAGE_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventThresholds {
    /// Score a cell must reach to count towards a bin's coverage.
    #[serde(default = "default_evs_min")]
    pub evs_min: f64,
}

impl Default for EventThresholds {
    fn default() -> Self {
        Self {
            evs_min: DEFAULT_COVERAGE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    /// `area` or `route`.
    pub geometry_type: String,
    /// GeoJSON geometry object, validated on use.
    pub geometry: Value,
    pub start_ts: String,
    #[serde(default = "default_duration_min")]
    pub duration_min: i64,
    #[serde(default = "default_step_min")]
    pub step_min: i64,
    #[serde(default)]
    pub thresholds: EventThresholds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverse: Option<AdverseThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<WeightOverrides>,
}

/// Exact-coordinate key so repeated sample points share one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PointKey(u64, u64);

impl From<GeoPoint> for PointKey {
    fn from(point: GeoPoint) -> Self {
        Self(point.lon.to_bits(), point.lat.to_bits())
    }
}

/// Compute a corridor result and keep it in `store` for later export.
#[instrument(skip_all, fields(mode = %request.geometry_type, start = %request.start_ts))]
pub async fn run_event(
    providers: &Providers,
    settings: &Settings,
    store: &EventStore,
    request: &EventRequest,
) -> Result<Arc<CorridorReport>> {
    let mode: GeometryMode = request.geometry_type.parse()?;
    let geometry = parse_geometry(&request.geometry)?;
    let points = sample_points(mode, &geometry)?;
    let bins = daily_bins(&request.start_ts, request.duration_min, request.step_min)?;
    let threshold = request.thresholds.evs_min;
    if !threshold.is_finite() {
        return Err(ClimoError::InvalidRequest(
            "thresholds.evs_min must be a finite number".to_string(),
        ));
    }
    debug!(points = points.len(), days = bins.days.len(), "corridor sampled");

    let series = fetch_factor_series(providers, &points, settings.fetch_concurrency).await?;
    let scored = points
        .iter()
        .map(|point| {
            series
                .get(&PointKey::from(*point))
                .map(|s| (*point, s))
                .ok_or_else(|| ClimoError::Internal(format!("no series fetched for {point:?}")))
        })
        .collect::<Result<Vec<(GeoPoint, &FactorSeries)>>>()?;

    let weights = request
        .weights
        .unwrap_or_default()
        .apply(FactorWeights::climatology());
    let composer = ClimatologyComposer::new(settings.climo_half_width())
        .with_thresholds(request.adverse.unwrap_or_default())
        .with_weights(weights);

    let cells = score_cells(&scored, &bins.days, &composer);
    let aggregates = aggregate(&cells, bins.days.len(), threshold);
    let best = best_time_index(&aggregates);
    let times: Vec<String> = bins.days.iter().copied().map(day_iso).collect();
    let best_time_iso = times.get(best).cloned();

    let mut notes = vec![
        CLIMO_SOURCE_NOTE.to_string(),
        format!(
            "Subscores are 100 x (1 - P(adverse)) over a +/-{} day window; weights rain {:.2}, wind {:.2}, heat {:.2}, humidity {:.2}.",
            settings.climo_half_width(),
            weights.rain,
            weights.wind,
            weights.heat,
            weights.humidity
        ),
    ];
    if bins.coerced_to_daily {
        notes.push(format!(
            "step_min {} is finer than the daily climatology; bins were collapsed to calendar days (UTC).",
            request.step_min
        ));
    }
    if let Some(iso) = &best_time_iso {
        notes.push(format!("Best day by mean EVS: {iso}."));
    }

    let report = CorridorReport {
        event_id: EventStore::new_event_id(),
        times,
        cells,
        aggregates,
        best_time_index: best,
        meta: CorridorMeta {
            units: corridor_units(),
            sources: providers.sources(),
            notes: notes.join(" "),
            coverage_threshold: threshold,
            climo_window_days: settings.climo_window_days,
            coerced_to_daily: bins.coerced_to_daily,
            best_time_iso,
        },
    };
    info!(
        event_id = %report.event_id,
        cells = report.cells.len(),
        bins = report.times.len(),
        best_time_index = best,
        "corridor computed"
    );
    Ok(store.insert(report))
}

/// Fetch each distinct point once, with bounded concurrency.
async fn fetch_factor_series(
    providers: &Providers,
    points: &[GeoPoint],
    concurrency: usize,
) -> Result<HashMap<PointKey, FactorSeries>> {
    let mut seen = HashSet::new();
    let distinct: Vec<GeoPoint> = points
        .iter()
        .copied()
        .filter(|p| seen.insert(PointKey::from(*p)))
        .collect();

    stream::iter(distinct)
        .map(|point| async move {
            let raw = providers.fetch(point).await?;
            debug!(lon = point.lon, lat = point.lat, rows = raw.len(), "fetched point series");
            Ok::<_, ClimoError>((PointKey::from(point), FactorSeries::derive(&raw)))
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect()
}

fn corridor_units() -> IndexMap<String, String> {
    [
        ("evs", "score 0-100"),
        ("coverage", "fraction of cells with evs >= evs_min"),
        ("rain", "subscore from P(precip_mm_day >= rain_mm_day)"),
        ("wind", "subscore from P(wind_mph >= wind_mph)"),
        ("heat", "subscore from P(heatindex_F >= hi_F)"),
        ("humidity", "subscore from P(rh_pct >= rh_pct)"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
