//! HTTP layer exposing the climatology and corridor queries.

pub mod routes;
pub mod types;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{config::Settings, corridor::EventStore, data::Providers};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub providers: Providers,
    pub events: Arc<EventStore>,
}

impl AppState {
    pub fn new(settings: Settings, providers: Providers) -> Self {
        let events = Arc::new(EventStore::new(
            settings.event_cache_capacity,
            settings.event_cache_ttl,
        ));
        Self {
            settings,
            providers,
            events,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);
    let router = Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        .route("/api/meta", get(routes::meta))
        .route("/api/poe", post(routes::poe))
        .route("/api/event", post(routes::event))
        .route("/api/event/:event_id/export", get(routes::export))
        .route("/api/evs/observed", post(routes::observed))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return Some(base.allow_origin(Any));
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(base.allow_origin(AllowOrigin::list(allowed)))
}

pub async fn serve(settings: Settings, host: String, port: u16) -> Result<()> {
    let providers = Providers::from_settings(&settings).context("building data providers")?;
    let state = AppState::new(settings, providers);
    let app = router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, "serving parade-climo API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
