//! On-disk parquet cache of raw provider series, one file per point.

use std::{
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::{
    DataFrame, NamedFrom, ParquetReader, ParquetWriter, SerReader, Series,
};
use tracing::{info, warn};

use crate::{
    climo::{RawDaily, RawRow},
    corridor::GeoPoint,
    data::{power::PowerClient, DailyProvider},
    error::{ClimoError, Result},
};

const COLUMNS: [&str; 6] = ["tmaxC", "tminC", "tavgC", "rh", "ws_ms", "pr_mm"];

/// Wraps a POWER client with one parquet file per point.
///
/// A file younger than `max_age` is served as is; an older one is refetched and overwritten in
/// place, and still served when the refetch fails.
pub struct ParquetCache {
    inner: PowerClient,
    dir: PathBuf,
    max_age: Duration,
}

impl ParquetCache {
    pub fn new(inner: PowerClient, dir: PathBuf, max_age: Duration) -> Self {
        Self {
            inner,
            dir,
            max_age,
        }
    }

    /// Cache file for a point, keyed by rounded coordinates and the span start.
    pub fn path_for(&self, point: GeoPoint) -> PathBuf {
        let (start, _) = self.inner.span();
        self.dir
            .join(format!("{:.3}_{:.3}_{start}.parquet", point.lat, point.lon))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age <= self.max_age)
    }
}

#[async_trait]
impl DailyProvider for ParquetCache {
    async fn fetch_point(&self, point: GeoPoint) -> Result<RawDaily> {
        let path = self.path_for(point);
        let cached = if path.exists() {
            match read_parquet(&path) {
                Ok(raw) => Some(raw),
                Err(err) => {
                    warn!(%err, path = %path.display(), "unreadable cache entry, refetching");
                    None
                }
            }
        } else {
            None
        };

        if let Some(raw) = &cached {
            if self.is_fresh(&path) {
                info!(path = %path.display(), rows = raw.len(), "using cached series");
                return Ok(raw.clone());
            }
        }

        let raw = match (self.inner.fetch_point(point).await, cached) {
            (Ok(raw), _) => raw,
            (Err(err), Some(stale)) if !stale.is_empty() => {
                warn!(%err, path = %path.display(), "refresh failed, serving stale cache");
                return Ok(stale);
            }
            (Err(err), _) => return Err(err),
        };
        if !raw.is_empty() {
            if let Err(err) = write_parquet(&raw, &path) {
                warn!(%err, path = %path.display(), "could not write series cache");
            }
        }
        Ok(raw)
    }

    fn source(&self) -> String {
        self.inner.source()
    }
}

/// Persist a raw frame with a `date` column (`YYYY-MM-DD`) and the six raw columns.
pub fn write_parquet(raw: &RawDaily, path: &Path) -> Result<()> {
    let dates: Vec<String> = raw.iter().map(|(date, _)| date.to_string()).collect();
    let column = |pick: fn(&RawRow) -> Option<f64>| -> Vec<Option<f64>> {
        raw.iter().map(|(_, row)| pick(row)).collect()
    };
    let mut df = DataFrame::new(vec![
        Series::new("date".into(), dates),
        Series::new(COLUMNS[0].into(), column(|r| r.tmax_c)),
        Series::new(COLUMNS[1].into(), column(|r| r.tmin_c)),
        Series::new(COLUMNS[2].into(), column(|r| r.tavg_c)),
        Series::new(COLUMNS[3].into(), column(|r| r.rh)),
        Series::new(COLUMNS[4].into(), column(|r| r.ws_ms)),
        Series::new(COLUMNS[5].into(), column(|r| r.pr_mm)),
    ])?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    ParquetWriter::new(file).finish(&mut df)?;
    info!(path = %path.display(), rows = df.height(), "wrote series cache");
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<RawDaily> {
    let df = ParquetReader::new(File::open(path).map_err(io_error)?).finish()?;
    let dates = df.column("date")?.str()?;
    let tmax = df.column(COLUMNS[0])?.f64()?;
    let tmin = df.column(COLUMNS[1])?.f64()?;
    let tavg = df.column(COLUMNS[2])?.f64()?;
    let rh = df.column(COLUMNS[3])?.f64()?;
    let ws = df.column(COLUMNS[4])?.f64()?;
    let pr = df.column(COLUMNS[5])?.f64()?;

    let mut raw = RawDaily::new();
    for idx in 0..df.height() {
        let Some(date) = dates.get(idx) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|err| ClimoError::Internal(format!("bad cached date '{date}': {err}")))?;
        raw.insert(
            date,
            RawRow {
                tmax_c: tmax.get(idx),
                tmin_c: tmin.get(idx),
                tavg_c: tavg.get(idx),
                rh: rh.get(idx),
                ws_ms: ws.get(idx),
                pr_mm: pr.get(idx),
            },
        );
    }
    Ok(raw)
}

fn io_error(err: std::io::Error) -> ClimoError {
    ClimoError::Internal(format!("series cache io: {err}"))
}
