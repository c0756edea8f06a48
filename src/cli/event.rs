//! CLI entry-point for an Event-Corridor query.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    corridor::{store::export_csv, EventStore},
    service::{
        event::{DEFAULT_DURATION_MIN, DEFAULT_STEP_MIN},
        run_event, EventRequest, EventThresholds,
    },
};

/// Args for the `event` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// `area` or `route`.
    #[arg(long)]
    pub geometry_type: String,
    /// Path to a GeoJSON geometry file, or the geometry JSON itself.
    #[arg(long)]
    pub geometry: String,
    /// Event start, ISO 8601.
    #[arg(long)]
    pub start: String,
    #[arg(long, default_value_t = DEFAULT_DURATION_MIN)]
    pub duration_min: i64,
    #[arg(long, default_value_t = DEFAULT_STEP_MIN)]
    pub step_min: i64,
    /// Coverage threshold on the 0-100 score.
    #[arg(long, default_value_t = 70.0)]
    pub evs_min: f64,
    /// Read the daily series from a station CSV instead of the upstream provider.
    #[arg(long)]
    pub series_csv: Option<PathBuf>,
    /// Also write the tabular CSV export here.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

fn load_geometry(raw: &str) -> Result<Value> {
    let path = PathBuf::from(raw);
    let text = if path.is_file() {
        std::fs::read_to_string(&path)
            .with_context(|| format!("read geometry file {}", path.display()))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text).context("geometry is neither a readable file nor valid JSON")
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let providers = super::providers(&settings, args.series_csv.as_deref())?;
    let store = EventStore::new(1, settings.event_cache_ttl);
    let request = EventRequest {
        geometry_type: args.geometry_type,
        geometry: load_geometry(&args.geometry)?,
        start_ts: args.start,
        duration_min: args.duration_min,
        step_min: args.step_min,
        thresholds: EventThresholds {
            evs_min: args.evs_min,
        },
        adverse: None,
        weights: None,
    };
    let report = run_event(&providers, &settings, &store, &request).await?;

    if let Some(path) = &args.export {
        let csv = export_csv(&report)?;
        std::fs::write(path, csv).with_context(|| format!("write export {}", path.display()))?;
        info!(path = %path.display(), "wrote corridor export");
    }
    super::print_json(report.as_ref())
}
