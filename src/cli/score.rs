//! CLI entry-point for direct-observation scoring.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{
    evs::Observation,
    service::{score_observed, ObservedRequest},
};

/// Args for the `score` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[arg(long, default_value_t = 0.0)]
    pub rain_mm_hr: f64,
    #[arg(long, default_value_t = 0.0)]
    pub wind_mph: f64,
    #[arg(long = "heat-index-f")]
    pub heat_index_f: f64,
    #[arg(long)]
    pub rh_pct: f64,
}

#[instrument]
pub async fn run(args: Args) -> Result<()> {
    let request = ObservedRequest {
        observation: Observation {
            rain_mm_hr: args.rain_mm_hr,
            wind_mph: args.wind_mph,
            heatindex_f: args.heat_index_f,
            rh_pct: args.rh_pct,
        },
        weights: None,
    };
    super::print_json(&score_observed(&request)?)
}
