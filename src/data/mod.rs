//! Raw daily series providers and precipitation augmentation.

pub mod cache;
pub mod csv_file;
pub mod power;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    climo::{DailySeries, RawDaily},
    config::Settings,
    corridor::GeoPoint,
    error::{ClimoError, Result},
};

/// Supplies the multi-year daily raw columns for a point.
#[async_trait]
pub trait DailyProvider: Send + Sync {
    async fn fetch_point(&self, point: GeoPoint) -> Result<RawDaily>;

    /// Human-readable provenance line.
    fn source(&self) -> String;
}

/// Optional secondary source of daily precipitation.
#[async_trait]
pub trait PrecipProvider: Send + Sync {
    async fn fetch_precip(&self, point: GeoPoint) -> Result<DailySeries>;

    fn source(&self) -> String;
}

/// The primary provider plus the optional precipitation enrichment.
#[derive(Clone)]
pub struct Providers {
    pub daily: Arc<dyn DailyProvider>,
    pub precip: Option<Arc<dyn PrecipProvider>>,
}

impl Providers {
    pub fn new(daily: Arc<dyn DailyProvider>) -> Self {
        Self {
            daily,
            precip: None,
        }
    }

    pub fn with_precip(mut self, precip: Arc<dyn PrecipProvider>) -> Self {
        self.precip = Some(precip);
        self
    }

    /// NASA POWER, optionally behind the parquet cache.
    ///
    /// POWER already reports precipitation, so no secondary source is attached here.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(power_daily(settings)?))
    }

    pub fn sources(&self) -> Vec<String> {
        let mut sources = vec![self.daily.source()];
        sources.extend(self.precip.as_ref().map(|p| p.source()));
        sources
    }

    /// Fetch the raw frame for a point and merge in secondary precipitation when available.
    ///
    /// An empty primary frame is an upstream failure; a failing precipitation source only
    /// costs the enrichment.
    pub async fn fetch(&self, point: GeoPoint) -> Result<RawDaily> {
        validate_point(point)?;
        let mut raw = self.daily.fetch_point(point).await?;
        if raw.is_empty() {
            return Err(ClimoError::EmptyUpstreamSeries {
                lat: point.lat,
                lon: point.lon,
            });
        }
        if let Some(precip) = &self.precip {
            match precip.fetch_precip(point).await {
                Ok(series) => {
                    let overridden = raw.override_precip(&series);
                    debug!(overridden, "merged secondary precipitation");
                }
                Err(err) => {
                    warn!(%err, "precipitation augmentation failed; keeping primary column")
                }
            }
        }
        Ok(raw)
    }
}

/// The POWER daily provider, behind the parquet cache when `SERIES_CACHE` is on.
pub fn power_daily(settings: &Settings) -> Result<Arc<dyn DailyProvider>> {
    let client = power::PowerClient::new(settings)?;
    if settings.series_cache {
        return Ok(Arc::new(cache::ParquetCache::new(
            client,
            settings.series_cache_dir(),
            settings.series_cache_max_age,
        )));
    }
    Ok(Arc::new(client))
}

pub fn validate_point(point: GeoPoint) -> Result<()> {
    let lat_ok = (-90.0..=90.0).contains(&point.lat);
    let lon_ok = (-180.0..=180.0).contains(&point.lon);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(ClimoError::InvalidRequest(format!(
            "lat/lon out of range: {}, {}",
            point.lat, point.lon
        )))
    }
}
