//! HTTP route handlers for Axum.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{error, warn};

use crate::{
    api::types::{ErrorBody, ErrorDetail, ExportFormat, ExportQuery, HealthDto, MetaDto, RootDto},
    corridor::store::export_csv,
    error::ClimoError,
    service::{
        self, run_event, run_poe, score_observed, EventRequest, ObservedRequest, ObservedResponse,
        PoeRequest, PoeResponse, APP_NAME, CLIMO_SOURCE_NOTE,
    },
};

use super::AppState;

type ApiResult<T> = Result<Json<T>, ClimoError>;

impl ClimoError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidGeometry { .. }
            | Self::InvalidTimeParameters(_)
            | Self::UnsupportedVariable(_)
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::EmptyUpstreamSeries { .. } | Self::UpstreamProviderFailure(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::EventNotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ClimoError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                hint: self.hint(),
            },
        };
        (status, Json(body)).into_response()
    }
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ClimoError> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| ClimoError::InvalidRequest(rejection.body_text()))
}

pub async fn root() -> Json<RootDto> {
    Json(RootDto {
        ok: true,
        name: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn health() -> Json<HealthDto> {
    Json(HealthDto {
        status: "healthy".to_string(),
        time_utc: Utc::now().to_rfc3339(),
    })
}

pub async fn meta(State(state): State<AppState>) -> Json<MetaDto> {
    Json(MetaDto {
        name: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        datasets: vec!["NASA POWER daily point (climatology)".to_string()],
        units: service::variable_units(),
        cadence: "daily".to_string(),
        sources: state.providers.sources(),
        notes: format!(
            "{CLIMO_SOURCE_NOTE} Corridor scores use a {}-day window.",
            state.settings.climo_window_days
        ),
    })
}

pub async fn poe(
    State(state): State<AppState>,
    body: Result<Json<PoeRequest>, JsonRejection>,
) -> ApiResult<PoeResponse> {
    let request = payload(body)?;
    Ok(Json(run_poe(&state.providers, &request).await?))
}

pub async fn event(
    State(state): State<AppState>,
    body: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Response, ClimoError> {
    let request = payload(body)?;
    let report = run_event(&state.providers, &state.settings, &state.events, &request).await?;
    Ok(Json(report.as_ref()).into_response())
}

pub async fn export(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ClimoError> {
    let format = match query.format.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("csv") => ExportFormat::Csv,
        Some("json") => ExportFormat::Json,
        Some(other) => {
            return Err(ClimoError::InvalidRequest(format!(
                "format must be csv or json, got '{other}'"
            )))
        }
    };
    let report = state.events.get(&event_id)?;
    match format {
        ExportFormat::Json => Ok(Json(report.as_ref()).into_response()),
        ExportFormat::Csv => {
            let body = export_csv(&report)?;
            let disposition = format!("attachment; filename=\"event_{event_id}.csv\"");
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}

pub async fn observed(
    body: Result<Json<ObservedRequest>, JsonRejection>,
) -> ApiResult<ObservedResponse> {
    let request = payload(body)?;
    Ok(Json(score_observed(&request)?))
}
