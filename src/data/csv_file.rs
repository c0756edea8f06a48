//! Offline provider backed by a station CSV file.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::{
    climo::{RawDaily, RawRow},
    corridor::GeoPoint,
    data::DailyProvider,
    error,
};

/// `date,tmaxC,tminC,tavgC,rh,ws_ms,pr_mm`; empty cells are missing observations.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    #[serde(rename = "tmaxC")]
    tmax_c: Option<f64>,
    #[serde(rename = "tminC")]
    tmin_c: Option<f64>,
    #[serde(rename = "tavgC")]
    tavg_c: Option<f64>,
    rh: Option<f64>,
    ws_ms: Option<f64>,
    pr_mm: Option<f64>,
}

/// Serves the same station series for every requested point.
pub struct CsvFileProvider {
    raw: RawDaily,
    label: String,
}

impl CsvFileProvider {
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("open series csv {}", path.display()))?;
        let mut raw = RawDaily::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = record.with_context(|| format!("parse series csv row {}", line + 2))?;
            raw.insert(
                row.date,
                RawRow {
                    tmax_c: row.tmax_c,
                    tmin_c: row.tmin_c,
                    tavg_c: row.tavg_c,
                    rh: row.rh,
                    ws_ms: row.ws_ms,
                    pr_mm: row.pr_mm,
                },
            );
        }
        info!(path = %path.display(), rows = raw.len(), "loaded station series");
        Ok(Self {
            raw,
            label: format!("station file {}", path.display()),
        })
    }

    pub fn from_raw(raw: RawDaily, label: impl Into<String>) -> Self {
        Self {
            raw,
            label: label.into(),
        }
    }
}

#[async_trait]
impl DailyProvider for CsvFileProvider {
    async fn fetch_point(&self, _point: GeoPoint) -> error::Result<RawDaily> {
        Ok(self.raw.clone())
    }

    fn source(&self) -> String {
        self.label.clone()
    }
}
