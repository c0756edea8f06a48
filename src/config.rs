//! Runtime configuration utilities for parade-climo.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Total DOY window span used by the corridor composer (half-width is half of it).
    pub climo_window_days: u32,
    /// NASA POWER daily point endpoint.
    pub power_base_url: String,
    /// First day requested from POWER, `YYYYMMDD`.
    pub power_start: String,
    pub power_timeout: Duration,
    /// Fill a station file's precipitation from POWER.
    pub precip_augment: bool,
    /// Keep fetched raw series as parquet under `data_dir`.
    pub series_cache: bool,
    /// Cached series older than this are refetched.
    pub series_cache_max_age: Duration,
    /// Root folder for cached data artefacts.
    pub data_dir: PathBuf,
    /// Concurrent point fetches per corridor request.
    pub fetch_concurrency: usize,
    pub event_cache_ttl: Duration,
    pub event_cache_capacity: usize,
    /// `*` or explicit allowed origins; empty disables CORS headers.
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Self::from_lookup(|key| env::var(key).ok());
        if settings.series_cache {
            std::fs::create_dir_all(settings.series_cache_dir())
                .context("creating series cache dir")?;
        }
        Ok(settings)
    }

    /// Resolve every key through `lookup`, falling back to defaults on absent or bad values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(default)
        };

        Self {
            climo_window_days: parsed("CLIMO_WINDOW_DAYS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(14),
            power_base_url: lookup("POWER_BASE_URL").unwrap_or_else(|| {
                "https://power.larc.nasa.gov/api/temporal/daily/point".to_string()
            }),
            power_start: lookup("POWER_START").unwrap_or_else(|| "19810101".to_string()),
            power_timeout: Duration::from_secs(parsed("POWER_TIMEOUT_SECS").unwrap_or(45)),
            precip_augment: flag("PRECIP_AUGMENT", false),
            series_cache: flag("SERIES_CACHE", true),
            series_cache_max_age: Duration::from_secs(
                parsed("SERIES_CACHE_MAX_AGE_HOURS").unwrap_or(24) * 3600,
            ),
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            fetch_concurrency: parsed("FETCH_CONCURRENCY")
                .and_then(|v| usize::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(4),
            event_cache_ttl: Duration::from_secs(parsed("EVENT_CACHE_TTL_SECS").unwrap_or(3600)),
            event_cache_capacity: parsed("EVENT_CACHE_CAPACITY")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(256),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Half-width in days of the corridor pooling window.
    pub fn climo_half_width(&self) -> u32 {
        self.climo_window_days / 2
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    pub fn series_cache_dir(&self) -> PathBuf {
        self.join_data("cache/power")
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
