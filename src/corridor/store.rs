//! Short-lived store of corridor results, and their tabular export.

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use lru::LruCache;
use tracing::debug;
use uuid::Uuid;

use crate::{
    corridor::CorridorReport,
    error::{ClimoError, Result},
};

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

pub const CSV_HEADER: [&str; 9] = [
    "time",
    "cell_id",
    "lon",
    "lat",
    "evs_total",
    "rain_sub",
    "wind_sub",
    "heat_sub",
    "humidity_sub",
];

struct StoredEvent {
    report: Arc<CorridorReport>,
    expires_at: Instant,
}

/// Corridor results keyed by event id, evicted least-recently-used beyond `capacity` and
/// dropped once older than `ttl`.
pub struct EventStore {
    entries: Mutex<LruCache<String, StoredEvent>>,
    ttl: Duration,
}

impl EventStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Eight hex characters, unique enough for the store's short lifetime.
    pub fn new_event_id() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    pub fn insert(&self, report: CorridorReport) -> Arc<CorridorReport> {
        let report = Arc::new(report);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(
            report.event_id.clone(),
            StoredEvent {
                report: Arc::clone(&report),
                expires_at: Instant::now() + self.ttl,
            },
        );
        debug!(event_id = %report.event_id, stored = entries.len(), "stored corridor result");
        report
    }

    pub fn get(&self, event_id: &str) -> Result<Arc<CorridorReport>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(event_id) {
            Some(stored) if Instant::now() < stored.expires_at => {
                return Ok(Arc::clone(&stored.report))
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(event_id);
        }
        Err(ClimoError::EventNotFound(event_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// CSV dump: provenance comment lines, then one row per (cell, time).
pub fn export_csv(report: &CorridorReport) -> Result<String> {
    let units = report
        .meta
        .units
        .iter()
        .map(|(key, unit)| format!("{key}={unit}"))
        .collect::<Vec<_>>()
        .join("; ");
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"# Will it Rain on My Parade? Event Corridor Export\n");
    buffer.extend_from_slice(format!("# Units: {units}\n").as_bytes());
    buffer.extend_from_slice(format!("# Sources: {}\n", report.meta.sources.join("; ")).as_bytes());
    buffer.extend_from_slice(format!("# Notes: {}\n", report.meta.notes).as_bytes());

    let mut writer = csv::Writer::from_writer(buffer);
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for cell in &report.cells {
        for timed in &cell.evs {
            let time = report.times.get(timed.t).cloned().unwrap_or_default();
            let subs = &timed.evs.subscores;
            writer
                .write_record([
                    time,
                    cell.cell_id.to_string(),
                    format!("{:.6}", cell.lon),
                    format!("{:.6}", cell.lat),
                    format!("{:.2}", timed.evs.total),
                    format!("{:.1}", subs.rain),
                    format!("{:.1}", subs.wind),
                    format!("{:.1}", subs.heat),
                    format!("{:.1}", subs.humidity),
                ])
                .map_err(csv_error)?;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ClimoError::Internal(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| ClimoError::Internal(err.to_string()))
}

fn csv_error(err: csv::Error) -> ClimoError {
    ClimoError::Internal(format!("csv export: {err}"))
}
