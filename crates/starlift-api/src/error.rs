//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps orchestrator and domain errors to HTTP status codes with a JSON
//! error envelope. Instance-side failure reasons ARE surfaced to callers —
//! the control plane serves cluster operators who need to see what the
//! source or target instance said — but coordinator-internal errors stay
//! generic.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use starlift_orchestrator::OrchestratorError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `NOT_FOUND`, `VALIDATION_ERROR`).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type for all control-plane handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication failure (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An instance refused or failed an operation (502). The instance's
    /// reason is included in the response.
    #[error("instance error: {0}")]
    Instance(String),

    /// An instance did not respond in time (504).
    #[error("instance timeout: {0}")]
    InstanceTimeout(String),

    /// Internal coordinator error (500). Logged, not exposed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Instance(_) => (StatusCode::BAD_GATEWAY, "INSTANCE_ERROR"),
            Self::InstanceTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "INSTANCE_TIMEOUT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Instance(_) | Self::InstanceTimeout(_) => {
                tracing::warn!(error = %self, "instance-side failure")
            }
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        use starlift_gateway::GatewayError;
        match &err {
            OrchestratorError::UnknownSourceInstance(_)
            | OrchestratorError::SourceNotConnected(_)
            | OrchestratorError::UnknownTargetInstance(_)
            | OrchestratorError::SameInstance
            | OrchestratorError::InvalidPlatformIndex(_) => Self::Validation(err.to_string()),
            OrchestratorError::ExportNotFound(_) => Self::NotFound(err.to_string()),
            OrchestratorError::ExportWaitTimeout { .. } => Self::InstanceTimeout(err.to_string()),
            OrchestratorError::ExportRequestFailed(_)
            | OrchestratorError::ImportFailed { .. }
            | OrchestratorError::UploadImportFailed(_) => Self::Instance(err.to_string()),
            OrchestratorError::Rpc(rpc) => match rpc {
                GatewayError::Timeout { .. } => Self::InstanceTimeout(err.to_string()),
                GatewayError::NotConnected(_) | GatewayError::Disconnected(_) => {
                    Self::Instance(err.to_string())
                }
                GatewayError::Decode { .. } => Self::Internal(err.to_string()),
            },
        }
    }
}
