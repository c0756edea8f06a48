use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate};
use geo::Point;
use indexmap::IndexMap;
use parade_climo::{
    climo::{RawDaily, RawRow},
    corridor::{
        aggregate, best_time_index,
        geometry::{parse_geometry, sample_points, AREA_GRID, ROUTE_SAMPLES},
        score_cells,
        store::export_csv,
        timebins::{daily_bins, enumerate_bins, parse_target_date, parse_timestamp},
        Aggregate, CorridorMeta, CorridorReport, EventCell, EventStore, GeoPoint, Geometry,
        GeometryMode, TimedEvs,
    },
    error::ClimoError,
    evs::{ClimatologyComposer, Evs, FactorSeries, Subscores},
};
use proptest::prelude::*;
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn scored(total: f64) -> Evs {
    Evs {
        total,
        subscores: Subscores::neutral(),
    }
}

fn cell(cell_id: usize, totals: &[f64]) -> EventCell {
    EventCell {
        cell_id,
        lon: cell_id as f64,
        lat: 0.0,
        evs: totals
            .iter()
            .enumerate()
            .map(|(t, total)| TimedEvs {
                t,
                evs: scored(*total),
            })
            .collect(),
    }
}

fn report(event_id: &str) -> CorridorReport {
    let mut units = IndexMap::new();
    units.insert("evs".to_string(), "score 0-100".to_string());
    CorridorReport {
        event_id: event_id.to_string(),
        times: vec!["2024-07-04T00:00:00+00:00".to_string()],
        cells: vec![EventCell {
            cell_id: 0,
            lon: -84.334,
            lat: 34.023,
            evs: vec![TimedEvs {
                t: 0,
                evs: Evs {
                    total: 76.0,
                    subscores: Subscores {
                        rain: 80.0,
                        wind: 60.0,
                        heat: 90.0,
                        humidity: 70.0,
                    },
                },
            }],
        }],
        aggregates: vec![Aggregate {
            t: 0,
            coverage: 1.0,
            mean: 76.0,
            min: 76.0,
        }],
        best_time_index: 0,
        meta: CorridorMeta {
            units,
            sources: vec!["fixture".to_string()],
            notes: "one day".to_string(),
            coverage_threshold: 70.0,
            climo_window_days: 14,
            coerced_to_daily: true,
            best_time_iso: Some("2024-07-04T00:00:00+00:00".to_string()),
        },
    }
}

#[test]
fn geometry_accepts_geojson_objects() {
    let point = parse_geometry(&json!({"type": "Point", "coordinates": [-84.3, 34.0]}))
        .expect("point parses");
    assert_eq!(point, Geometry::Point(Point::new(-84.3, 34.0)));
}

#[test]
fn string_geometry_gets_a_hint() {
    let err = parse_geometry(&json!("Atlanta, GA")).expect_err("string rejected");
    assert_eq!(err.code(), "INVALID_GEOMETRY");
    assert!(err.hint().is_some());

    let err = parse_geometry(&json!({"type": "Point", "coordinates": "-84.3,34.0"}))
        .expect_err("string coordinates rejected");
    assert!(matches!(err, ClimoError::InvalidGeometry { hint: Some(_), .. }));

    assert!(parse_geometry(&json!({"type": "Circle", "coordinates": [0, 0]})).is_err());
}

#[test]
fn mode_must_match_geometry() {
    assert!(matches!(
        "circle".parse::<GeometryMode>(),
        Err(ClimoError::InvalidGeometry { .. })
    ));
    let line = parse_geometry(&json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]}))
        .expect("line parses");
    assert!(matches!(
        sample_points(GeometryMode::Area, &line),
        Err(ClimoError::InvalidGeometry { .. })
    ));
    let point = Geometry::Point(Point::new(0.0, 0.0));
    assert!(sample_points(GeometryMode::Route, &point).is_err());
}

#[test]
fn area_grid_keeps_interior_centres() {
    let square = parse_geometry(&json!({
        "type": "Polygon",
        "coordinates": [[[0, 0], [4, 0], [4, 3], [0, 3], [0, 0]]]
    }))
    .expect("polygon parses");
    let points = sample_points(GeometryMode::Area, &square).expect("sampled");
    assert_eq!(points.len(), AREA_GRID.0 * AREA_GRID.1);
    assert_eq!(points[0], GeoPoint::new(0.5, 0.5));

    let courtyard = parse_geometry(&json!({
        "type": "Polygon",
        "coordinates": [
            [[0, 0], [4, 0], [4, 3], [0, 3], [0, 0]],
            [[1, 1], [3, 1], [3, 2], [1, 2], [1, 1]]
        ]
    }))
    .expect("polygon with hole parses");
    let points = sample_points(GeometryMode::Area, &courtyard).expect("sampled");
    assert_eq!(points.len(), AREA_GRID.0 * AREA_GRID.1 - 2);
    assert!(!points.contains(&GeoPoint::new(1.5, 1.5)));
    assert!(!points.contains(&GeoPoint::new(2.5, 1.5)));
}

#[test]
fn area_falls_back_to_centroid_when_grid_misses() {
    let framed = parse_geometry(&json!({
        "type": "Polygon",
        "coordinates": [
            [[0, 0], [4, 0], [4, 3], [0, 3], [0, 0]],
            [[0.1, 0.1], [3.9, 0.1], [3.9, 2.9], [0.1, 2.9], [0.1, 0.1]]
        ]
    }))
    .expect("polygon with hole parses");
    let points = sample_points(GeometryMode::Area, &framed).expect("sampled");
    assert_eq!(points.len(), 1);
    assert!((points[0].lon - 2.0).abs() < 1e-9);
    assert!((points[0].lat - 1.5).abs() < 1e-9);
}

#[test]
fn route_is_sampled_by_arc_length() {
    let line = parse_geometry(&json!({"type": "LineString", "coordinates": [[0, 0], [11, 0]]}))
        .expect("line parses");
    let points = sample_points(GeometryMode::Route, &line).expect("sampled");
    assert_eq!(points.len(), ROUTE_SAMPLES);
    for (k, p) in points.iter().enumerate() {
        assert!((p.lon - k as f64).abs() < 1e-9, "point {k} at {}", p.lon);
    }

    let parts = parse_geometry(&json!({
        "type": "MultiLineString",
        "coordinates": [[[0, 0], [1, 0]], [[1, 0], [2, 0]]]
    }))
    .expect("multiline parses");
    let points = sample_points(GeometryMode::Route, &parts).expect("sampled");
    assert_eq!(points.len(), ROUTE_SAMPLES);
    assert!((points[ROUTE_SAMPLES - 1].lon - 2.0).abs() < 1e-9);

    let still = parse_geometry(&json!({"type": "LineString", "coordinates": [[1, 1], [1, 1]]}))
        .expect("degenerate line parses");
    assert_eq!(
        sample_points(GeometryMode::Route, &still).expect("sampled"),
        vec![GeoPoint::new(1.0, 1.0)]
    );
}

#[test]
fn bins_enumerate_whole_steps() {
    let bins = enumerate_bins("2024-07-04T10:00:00Z", 120, 30).expect("bins");
    assert_eq!(bins.len(), 4);
    assert_eq!(bins[3] - bins[0], Duration::minutes(90));

    let daily = daily_bins("2024-07-04T23:00:00Z", 180, 60).expect("daily");
    assert_eq!(daily.days, vec![date(2024, 7, 4), date(2024, 7, 5)]);
    assert!(daily.coerced_to_daily);

    let whole = daily_bins("2024-07-04", 3 * 1440, 1440).expect("daily");
    assert_eq!(whole.days.len(), 3);
    assert!(!whole.coerced_to_daily);
}

#[test]
fn bad_time_parameters_are_rejected() {
    for (duration, step) in [(0, 30), (120, 0), (-60, 30), (20, 30), (10_001, 1)] {
        assert!(
            matches!(
                enumerate_bins("2024-07-04T10:00:00Z", duration, step),
                Err(ClimoError::InvalidTimeParameters(_))
            ),
            "duration {duration} step {step}"
        );
    }
    assert!(matches!(
        enumerate_bins("next tuesday", 120, 30),
        Err(ClimoError::InvalidTimeParameters(_))
    ));
}

#[test]
fn bins_past_the_calendar_range_are_rejected() {
    for (duration, step) in [
        (2_000_000_000_000, 1_000_000_000_000),
        (i64::MAX, i64::MAX / 2),
    ] {
        assert!(
            matches!(
                daily_bins("2025-07-04T10:00:00Z", duration, step),
                Err(ClimoError::InvalidTimeParameters(_))
            ),
            "duration {duration} step {step}"
        );
    }
}

#[test]
fn timestamps_convert_to_utc_but_target_dates_do_not() {
    let ts = parse_timestamp("2024-07-04T23:30:00-05:00").expect("parses");
    assert_eq!(ts.date_naive(), date(2024, 7, 5));
    assert_eq!(
        parse_target_date("2024-07-04T23:30:00-05:00").expect("parses"),
        date(2024, 7, 4)
    );
    assert!(matches!(
        parse_target_date("July 4th"),
        Err(ClimoError::InvalidRequest(_))
    ));
}

#[test]
fn aggregates_summarise_each_bin() {
    let cells = vec![cell(0, &[80.0, 60.0]), cell(1, &[60.0, 80.0]), cell(2, &[90.0])];
    let aggregates = aggregate(&cells, 2, 70.0);
    assert_eq!(aggregates.len(), 2);

    let first = aggregates[0];
    assert!((first.coverage - 2.0 / 3.0).abs() < 1e-12);
    assert!((first.mean - 230.0 / 3.0).abs() < 1e-9);
    assert_eq!(first.min, 60.0);

    // the short cell only contributes to the first bin
    let second = aggregates[1];
    assert_eq!(second.coverage, 0.5);
    assert_eq!(second.mean, 70.0);
    assert_eq!(best_time_index(&aggregates), 0);
}

#[test]
fn best_time_prefers_the_earliest_tie() {
    let cells = vec![cell(0, &[50.0, 80.0, 80.0])];
    let aggregates = aggregate(&cells, 3, 70.0);
    assert_eq!(best_time_index(&aggregates), 1);
    assert_eq!(best_time_index(&[]), 0);
    let empty = aggregate(&[], 2, 70.0);
    assert!(empty.iter().all(|a| a.coverage == 0.0 && a.mean == 0.0));
}

#[test]
fn cells_are_scored_per_day() {
    let raw: RawDaily = (0..400)
        .map(|k| {
            (
                date(2015, 1, 1) + Duration::days(k),
                RawRow {
                    tmax_c: Some(25.0),
                    rh: Some(50.0),
                    ws_ms: Some(2.0),
                    pr_mm: Some(0.0),
                    ..RawRow::default()
                },
            )
        })
        .collect();
    let series = FactorSeries::derive(&raw);
    let points = [
        (GeoPoint::new(-84.0, 34.0), &series),
        (GeoPoint::new(-83.0, 34.0), &series),
    ];
    let days = [date(2024, 6, 1), date(2024, 6, 2)];
    let cells = score_cells(&points, &days, &ClimatologyComposer::new(7));
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[1].cell_id, 1);
    assert_eq!(cells[1].lon, -83.0);
    assert_eq!(cells[0].evs.iter().map(|e| e.t).collect::<Vec<_>>(), vec![0, 1]);
    assert!(cells[0].evs.iter().all(|e| (e.evs.total - 100.0).abs() < 1e-9));
}

#[test]
fn store_returns_until_expiry() {
    let store = EventStore::new(8, StdDuration::from_secs(60));
    let id = EventStore::new_event_id();
    assert_eq!(id.len(), 8);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

    store.insert(report(&id));
    assert_eq!(store.get(&id).expect("stored").event_id, id);
    assert!(matches!(
        store.get("deadbeef"),
        Err(ClimoError::EventNotFound(_))
    ));

    let expired = EventStore::new(8, StdDuration::ZERO);
    expired.insert(report("abc12345"));
    assert!(expired.get("abc12345").is_err());
    assert!(expired.is_empty());
}

#[test]
fn store_evicts_least_recently_used() {
    let store = EventStore::new(1, StdDuration::from_secs(60));
    store.insert(report("aaaaaaaa"));
    store.insert(report("bbbbbbbb"));
    assert_eq!(store.len(), 1);
    assert!(store.get("aaaaaaaa").is_err());
    assert!(store.get("bbbbbbbb").is_ok());
}

#[test]
fn csv_export_layout() {
    let csv = export_csv(&report("abc12345")).expect("export");
    insta::assert_snapshot!(csv.trim_end(), @r###"
    # Will it Rain on My Parade? Event Corridor Export
    # Units: evs=score 0-100
    # Sources: fixture
    # Notes: one day
    time,cell_id,lon,lat,evs_total,rain_sub,wind_sub,heat_sub,humidity_sub
    2024-07-04T00:00:00+00:00,0,-84.334000,34.023000,76.00,80.0,60.0,90.0,70.0
    "###);
}

proptest! {
    #[test]
    fn aggregates_stay_within_score_bounds(
        totals in prop::collection::vec(prop::collection::vec(0.0f64..=100.0, 0..6), 1..8),
        threshold in 0.0f64..=100.0,
    ) {
        let cells: Vec<EventCell> = totals
            .iter()
            .enumerate()
            .map(|(id, scores)| cell(id, scores))
            .collect();
        let bins = totals.iter().map(Vec::len).max().unwrap_or(0);
        let aggregates = aggregate(&cells, bins, threshold);
        for agg in &aggregates {
            prop_assert!((0.0..=1.0).contains(&agg.coverage));
            let scores: Vec<f64> = totals.iter().filter_map(|s| s.get(agg.t).copied()).collect();
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(agg.min <= agg.mean + 1e-9 && agg.mean <= max + 1e-9);
        }
        let best = best_time_index(&aggregates);
        if let Some(top) = aggregates.get(best) {
            prop_assert!(aggregates.iter().all(|a| a.mean <= top.mean));
            prop_assert!(aggregates[..best].iter().all(|a| a.mean < top.mean));
        }
    }
}
