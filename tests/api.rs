use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate};
use parade_climo::{
    api::{router, AppState},
    climo::{RawDaily, RawRow},
    config::Settings,
    data::{csv_file::CsvFileProvider, Providers},
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn station_record() -> RawDaily {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid date");
    (0..3 * 365)
        .map(|k| {
            (
                start + Duration::days(k),
                RawRow {
                    tmax_c: Some(30.0),
                    tmin_c: Some(18.0),
                    tavg_c: Some(24.0),
                    rh: Some(55.0),
                    ws_ms: Some(4.0),
                    pr_mm: Some(if k % 3 == 0 { 12.0 } else { 0.0 }),
                },
            )
        })
        .collect()
}

fn app() -> Router {
    let provider = CsvFileProvider::from_raw(station_record(), "test station");
    let providers = Providers::new(Arc::new(provider));
    router(AppState::new(Settings::default(), providers))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn route_request() -> Value {
    json!({
        "geometry_type": "route",
        "geometry": {"type": "LineString", "coordinates": [[-84.4, 33.7], [-84.3, 33.8]]},
        "start_ts": "2024-07-04T18:00:00Z",
        "duration_min": 120,
        "step_min": 30
    })
}

#[tokio::test]
async fn service_endpoints_describe_themselves() {
    let app = app();
    let (status, root) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["ok"], true);

    let (_, health) = send(&app, get("/api/health")).await;
    assert_eq!(health["status"], "healthy");

    let (_, meta) = send(&app, get("/api/meta")).await;
    assert_eq!(meta["units"]["precip_mm_day"], "mm/day");
    assert_eq!(meta["cadence"], "daily");
    assert_eq!(meta["sources"][0], "test station");
}

#[tokio::test]
async fn poe_returns_results_in_request_order() {
    let app = app();
    let body = json!({
        "lat": 33.75,
        "lon": -84.39,
        "date": "2024-07-01",
        "window_days": 14,
        "metrics": [
            {"var": "tmaxF", "threshold": 90, "op": "ge"},
            {"var": "precip_mm_day", "threshold": 10, "bins": 4}
        ]
    });
    let (status, response) = send(&app, post("/api/poe", body)).await;
    assert_eq!(status, StatusCode::OK);

    let results = response["results"].as_object().expect("results object");
    let keys: Vec<&String> = results.keys().collect();
    assert_eq!(keys, vec!["tmaxF", "precip_mm_day"]);
    assert_eq!(response["results"]["tmaxF"]["poe"], 0.0);
    assert_eq!(response["results"]["precip_mm_day"]["hist"]["pdf"].as_array().map(Vec::len), Some(4));
    assert_eq!(response["meta"]["samples"], 45);
    assert_eq!(response["meta"]["half_width_days"], 7);
    assert_eq!(response["meta"]["mode"], "climatology");
}

#[tokio::test]
async fn poe_validation_errors_use_the_error_envelope() {
    let app = app();
    let empty = json!({"lat": 33.75, "lon": -84.39, "date": "2024-07-01", "metrics": []});
    let (status, body) = send(&app, post("/api/poe", empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let unknown = json!({
        "lat": 33.75, "lon": -84.39, "date": "2024-07-01",
        "metrics": [{"var": "snow_cm", "threshold": 1}]
    });
    let (status, body) = send(&app, post("/api/poe", unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_VARIABLE");
    assert!(body["error"]["hint"]
        .as_str()
        .is_some_and(|hint| hint.contains("precip_mm_day")));

    let wide = json!({
        "lat": 33.75, "lon": -84.39, "date": "2024-07-01", "window_days": 90,
        "metrics": [{"var": "wind_mph", "threshold": 20}]
    });
    let (status, _) = send(&app, post("/api/poe", wide)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/api/poe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn event_round_trips_through_export() {
    let app = app();
    let (status, event) = send(&app, post("/api/event", route_request())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["times"].as_array().map(Vec::len), Some(1));
    assert_eq!(event["cells"].as_array().map(Vec::len), Some(12));
    assert_eq!(event["aggregates"].as_array().map(Vec::len), Some(1));
    assert_eq!(event["best_time_index"], 0);
    assert_eq!(event["meta"]["coerced_to_daily"], true);
    assert_eq!(event["meta"]["coverage_threshold"], 70.0);
    assert!(event["cells"][0]["evs"][0]["total"].is_number());
    assert!(event["cells"][0]["evs"][0]["humidity"].is_number());

    let event_id = event["event_id"].as_str().expect("event id").to_string();
    assert_eq!(event_id.len(), 8);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/event/{event_id}/export?format=csv")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let csv = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(csv.starts_with("# Will it Rain on My Parade? Event Corridor Export"));
    assert_eq!(csv.lines().filter(|l| l.starts_with("2024-07-04")).count(), 12);

    let (status, exported) =
        send(&app, get(&format!("/api/event/{event_id}/export?format=json"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exported, event);

    let (status, body) =
        send(&app, get(&format!("/api/event/{event_id}/export?format=xml"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, body) = send(&app, get("/api/event/ffffffff/export")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn event_rejects_bad_geometry_and_times() {
    let app = app();
    let mut named = route_request();
    named["geometry"] = json!("Peachtree Street");
    let (status, body) = send(&app, post("/api/event", named)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_GEOMETRY");
    assert!(body["error"]["hint"].is_string());

    let mut polygon_as_route = route_request();
    polygon_as_route["geometry_type"] = json!("area");
    let (_, body) = send(&app, post("/api/event", polygon_as_route)).await;
    assert_eq!(body["error"]["code"], "INVALID_GEOMETRY");

    let mut zero = route_request();
    zero["duration_min"] = json!(0);
    let (status, body) = send(&app, post("/api/event", zero)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_TIME_PARAMETERS");
}

#[tokio::test]
async fn observed_scoring_uses_direct_strategy() {
    let app = app();
    let body = json!({"rain_mm_hr": 3.0, "wind_mph": 22, "heatindex_F": 97, "rh_pct": 85});
    let (status, response) = send(&app, post("/api/evs/observed", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["strategy"], "direct_observation");
    assert_eq!(response["rain"], 20.0);
    let total = response["total"].as_f64().expect("total");
    assert!((total - 28.5).abs() < 1e-9);
}
