//! `serve`: run the PoE and event-corridor JSON API.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{api, config::Settings};

/// Run the Axum server.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Port to bind (default 8000).
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
    /// Host address, defaults to localhost.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// Allowed CORS origin, repeatable; replaces `CORS_ORIGINS` when given.
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, mut settings: Settings) -> Result<()> {
    if !args.cors_origins.is_empty() {
        settings.cors_origins = args.cors_origins;
    }
    info!(
        climo_window_days = settings.climo_window_days,
        series_cache = settings.series_cache,
        event_cache_capacity = settings.event_cache_capacity,
        "serving climatology queries"
    );
    api::serve(settings, args.host, args.port).await
}
