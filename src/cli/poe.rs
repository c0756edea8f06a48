//! CLI entry-point for a single-point probability-of-exceedance query.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    service::{run_poe, MetricSpec, PoeRequest},
};

/// Args for the `poe` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
    /// Target date, `YYYY-MM-DD`.
    #[arg(long)]
    pub date: String,
    /// Total day-of-year window span.
    #[arg(long, default_value_t = 14)]
    pub window_days: i64,
    /// `VAR:OP:THRESHOLD`, e.g. `precip_mm_day:ge:10`. Repeatable.
    #[arg(long = "metric", required = true, value_parser = parse_metric)]
    pub metrics: Vec<MetricSpec>,
    /// Read the daily series from a station CSV instead of the upstream provider.
    #[arg(long)]
    pub series_csv: Option<PathBuf>,
}

/// Parse `VAR:OP:THRESHOLD`; `VAR:THRESHOLD` defaults the operator to `ge`.
pub fn parse_metric(raw: &str) -> Result<MetricSpec, String> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let (var, op, threshold) = match parts.as_slice() {
        [var, op, threshold] => (*var, Some(op.to_string()), *threshold),
        [var, threshold] => (*var, None, *threshold),
        _ => return Err(format!("expected VAR:OP:THRESHOLD, got '{raw}'")),
    };
    let threshold = threshold
        .parse::<f64>()
        .map_err(|err| format!("bad threshold '{threshold}': {err}"))?;
    Ok(MetricSpec {
        var: var.to_string(),
        threshold,
        op,
        bins: None,
    })
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let providers = super::providers(&settings, args.series_csv.as_deref())?;
    let request = PoeRequest {
        lat: args.lat,
        lon: args.lon,
        date: args.date,
        window_days: args.window_days,
        metrics: args.metrics,
    };
    let response = run_poe(&providers, &request).await?;
    info!(samples = response.meta.samples, "poe query finished");
    super::print_json(&response)
}
