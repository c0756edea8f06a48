//! Error kinds surfaced by the climatology engine and its request layer.

use thiserror::Error;

use crate::climo::Variable;

/// Every failure a PoE or corridor request can end in.
///
/// All variants are deterministic functions of the request and the upstream data; none of them
/// is retried inside the crate.
#[derive(Debug, Error)]
pub enum ClimoError {
    /// Geometry malformed or wrong for the requested mode.
    #[error("invalid geometry: {message}")]
    InvalidGeometry { message: String, hint: Option<String> },

    /// Non-positive duration/step or an unparsable timestamp.
    #[error("invalid time parameters: {0}")]
    InvalidTimeParameters(String),

    /// Metric variable outside the supported catalogue.
    #[error("unsupported variable: {0}")]
    UnsupportedVariable(String),

    /// The raw provider returned no usable rows for the point.
    #[error("upstream returned no data for point ({lat}, {lon})")]
    EmptyUpstreamSeries { lat: f64, lon: f64 },

    /// Transport or status failure talking to a data provider.
    #[error("upstream provider failure: {0}")]
    UpstreamProviderFailure(String),

    /// Any other malformed request field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Export requested for an unknown or expired event id.
    #[error("event {0} not found")]
    EventNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClimoError {
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
            hint: None,
        }
    }

    pub fn geometry_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            Self::InvalidTimeParameters(_) => "INVALID_TIME_PARAMETERS",
            Self::UnsupportedVariable(_) => "UNSUPPORTED_VARIABLE",
            Self::EmptyUpstreamSeries { .. } => "EMPTY_UPSTREAM_SERIES",
            Self::UpstreamProviderFailure(_) => "UPSTREAM_PROVIDER_FAILURE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::EventNotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Corrective hint for the caller, when one exists.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidGeometry { hint, .. } => hint.clone(),
            Self::InvalidTimeParameters(_) => Some(
                "start_ts must be ISO 8601 and duration_min/step_min must be positive".to_string(),
            ),
            Self::UnsupportedVariable(_) => Some(format!(
                "supported variables: {}",
                Variable::ALL
                    .iter()
                    .map(|v| v.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            _ => None,
        }
    }
}

impl From<polars::error::PolarsError> for ClimoError {
    fn from(value: polars::error::PolarsError) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClimoError>;
