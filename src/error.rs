//! Gateway error types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::memory::WorkflowStep;

/// Gateway error types.
///
/// Cloneable so a single failed generation can be handed to every caller
/// that attached to it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    // Network errors: no response was received at all
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<GatewayError>,
    },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("empty response from model")]
    EmptyResponse,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limit exceeded, try again later")]
    RateLimited,

    #[error("unauthorized")]
    Unauthorized,

    #[error("admin endpoint disabled: no admin token configured")]
    AdminDisabled,

    #[error("step '{step}' is missing prerequisites: {missing:?}")]
    MissingPrerequisites {
        step: WorkflowStep,
        missing: Vec<WorkflowStep>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::MissingPrerequisites { .. } => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AdminDisabled => StatusCode::FORBIDDEN,
            Self::Transport(_)
            | Self::Status { .. }
            | Self::RetriesExhausted { .. }
            | Self::EmptyResponse => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
