//! NASA POWER daily point client.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::{
    climo::{DailySeries, RawDaily, RawRow},
    config::Settings,
    corridor::GeoPoint,
    data::{DailyProvider, PrecipProvider},
    error::{ClimoError, Result},
};

pub const T2M_MAX: &str = "T2M_MAX";
pub const T2M_MIN: &str = "T2M_MIN";
pub const T2M: &str = "T2M";
pub const RH2M: &str = "RH2M";
pub const WS10M: &str = "WS10M";
pub const PRECTOTCORR: &str = "PRECTOTCORR";

const DAILY_PARAMETERS: [&str; 6] = [T2M_MAX, T2M_MIN, T2M, RH2M, WS10M, PRECTOTCORR];

/// POWER marks missing cells with this value.
const FILL_VALUE: f64 = -999.0;

type ParameterTable = HashMap<String, BTreeMap<String, Option<f64>>>;

#[derive(Debug, Default, Deserialize)]
struct PowerResponse {
    #[serde(default)]
    properties: PowerProperties,
}

#[derive(Debug, Default, Deserialize)]
struct PowerProperties {
    #[serde(default)]
    parameter: ParameterTable,
}

#[derive(Clone)]
pub struct PowerClient {
    client: Client,
    base_url: String,
    start: String,
}

impl PowerClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("parade-climo/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.power_timeout)
            .gzip(true)
            .build()
            .map_err(|err| ClimoError::Internal(format!("building http client: {err}")))?;
        Ok(Self {
            client,
            base_url: settings.power_base_url.clone(),
            start: settings.power_start.clone(),
        })
    }

    /// Requested `(start, end)` in POWER's `YYYYMMDD` form; the span ends today (UTC).
    pub fn span(&self) -> (String, String) {
        (self.start.clone(), Utc::now().format("%Y%m%d").to_string())
    }

    #[instrument(skip(self))]
    async fn fetch_body(&self, point: GeoPoint, parameters: &[&str]) -> Result<String> {
        let (start, end) = self.span();
        let query = [
            ("parameters", parameters.join(",")),
            ("community", "RE".to_string()),
            ("latitude", point.lat.to_string()),
            ("longitude", point.lon.to_string()),
            ("start", start),
            ("end", end),
            ("format", "JSON".to_string()),
        ];
        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(upstream)?;
        let status = response.status();
        let body = response.text().await.map_err(upstream)?;
        if !status.is_success() {
            let excerpt: String = body.chars().take(200).collect();
            return Err(ClimoError::UpstreamProviderFailure(format!(
                "POWER {status}: {excerpt}"
            )));
        }
        info!(bytes = body.len(), "fetched POWER series");
        Ok(body)
    }
}

fn upstream(err: reqwest::Error) -> ClimoError {
    ClimoError::UpstreamProviderFailure(err.to_string())
}

#[async_trait]
impl DailyProvider for PowerClient {
    async fn fetch_point(&self, point: GeoPoint) -> Result<RawDaily> {
        let body = self.fetch_body(point, &DAILY_PARAMETERS).await?;
        parse_daily(&body)
    }

    fn source(&self) -> String {
        "NASA POWER daily point (T2M_MAX, T2M_MIN, T2M, RH2M, WS10M, PRECTOTCORR)".to_string()
    }
}

/// POWER precipitation as a secondary source for a station file.
///
/// Reads the `pr_mm` column of whatever POWER provider it wraps, so a cached point costs no
/// network round trip.
#[derive(Clone)]
pub struct PowerPrecip {
    daily: Arc<dyn DailyProvider>,
}

impl PowerPrecip {
    pub fn new(daily: Arc<dyn DailyProvider>) -> Self {
        Self { daily }
    }
}

#[async_trait]
impl PrecipProvider for PowerPrecip {
    async fn fetch_precip(&self, point: GeoPoint) -> Result<DailySeries> {
        let raw = self.daily.fetch_point(point).await?;
        Ok(raw.column(|row| row.pr_mm))
    }

    fn source(&self) -> String {
        "NASA POWER daily precipitation (PRECTOTCORR)".to_string()
    }
}

fn parameter_table(body: &str) -> Result<ParameterTable> {
    let response: PowerResponse = serde_json::from_str(body)
        .map_err(|err| ClimoError::UpstreamProviderFailure(format!("decoding POWER json: {err}")))?;
    Ok(response.properties.parameter)
}

fn cell(table: &ParameterTable, parameter: &str, key: &str) -> Option<f64> {
    table
        .get(parameter)
        .and_then(|values| values.get(key).copied().flatten())
        .filter(|value| (value - FILL_VALUE).abs() > 1e-6)
}

fn parse_key(key: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(key, "%Y%m%d").ok();
    if date.is_none() {
        debug!(%key, "skipping non-daily POWER key");
    }
    date
}

/// Decode a POWER daily JSON payload into raw columns on the union of reported dates.
pub fn parse_daily(body: &str) -> Result<RawDaily> {
    let table = parameter_table(body)?;
    let mut keys: Vec<&String> = table.values().flat_map(|values| values.keys()).collect();
    keys.sort_unstable();
    keys.dedup();

    Ok(keys
        .into_iter()
        .filter_map(|key| {
            let date = parse_key(key)?;
            let row = RawRow {
                tmax_c: cell(&table, T2M_MAX, key),
                tmin_c: cell(&table, T2M_MIN, key),
                tavg_c: cell(&table, T2M, key),
                rh: cell(&table, RH2M, key),
                ws_ms: cell(&table, WS10M, key),
                pr_mm: cell(&table, PRECTOTCORR, key),
            };
            Some((date, row))
        })
        .collect())
}
