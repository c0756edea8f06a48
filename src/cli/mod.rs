//! Command-line interface wiring for parade-climo.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::{
    config::Settings,
    data::{self, csv_file::CsvFileProvider, power::PowerPrecip, Providers},
};

pub mod event;
pub mod poe;
pub mod score;
pub mod serve;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Climatology probability-of-exceedance and event viability scoring",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::run(args, settings).await,
            Commands::Poe(args) => poe::run(args, settings).await,
            Commands::Event(args) => event::run(args, settings).await,
            Commands::Score(args) => score::run(args).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the JSON API.
    Serve(serve::Args),
    /// Probability of exceedance for one point and date.
    Poe(poe::Args),
    /// Event-Corridor EVS over an area or route.
    Event(event::Args),
    /// Direct-observation EVS for a single set of readings.
    Score(score::Args),
}

/// A station CSV when given, otherwise the configured upstream providers.
pub(crate) fn providers(settings: &Settings, series_csv: Option<&Path>) -> Result<Providers> {
    match series_csv {
        Some(path) => {
            let providers = Providers::new(Arc::new(CsvFileProvider::from_path(path)?));
            if !settings.precip_augment {
                return Ok(providers);
            }
            let power = data::power_daily(settings).context("building POWER provider")?;
            Ok(providers.with_precip(Arc::new(PowerPrecip::new(power))))
        }
        None => Providers::from_settings(settings).context("building data providers"),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("rendering json output")?;
    println!("{rendered}");
    Ok(())
}
