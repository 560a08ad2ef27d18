//! JSON envelopes for the control API
//!
//! Success bodies are `{"success": true, "data": ..., "metadata": {...}}`,
//! failures are `{"success": false, "error": {...}}`.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use errors::SimError;
use serde::{Deserialize, Serialize};

pub use errors::ErrorInfo;

const fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    #[serde(default = "yes")]
    pub success: bool,
    pub data: T,
    /// Counts, previous values and other extras; omitted when empty
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub success: bool,
    pub error: ErrorInfo,
}

/// Handler error; renders as [`ErrorResponse`] with a matching status
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: ErrorInfo,
}

impl AppError {
    pub fn new(status: StatusCode, error: ErrorInfo) -> Self {
        Self { status, error }
    }

    fn plain(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, ErrorInfo::new(message).with_code(status.as_u16()))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::NOT_FOUND, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn with_details(self, details: impl Into<String>) -> Self {
        Self {
            error: self.error.with_details(details),
            ..self
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SimError> for AppError {
    fn from(err: SimError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", err);
        }
        Self::new(status, err.to_error_info())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal_error(format!("{:#}", err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// One entry in [`HealthStatus::checks`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ServiceStatus::Healthy,
            message: None,
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ServiceStatus::Degraded,
            message: Some(message.into()),
        }
    }
}

/// `GET /health` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ServiceStatus,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub checks: HashMap<String, ComponentHealth>,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_metadata_omitted_until_set() {
        let json = serde_json::to_value(SuccessResponse::new(3)).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("metadata").is_none());

        let json = serde_json::to_value(
            SuccessResponse::new(3).with_metadata("total", serde_json::json!(3)),
        )
        .unwrap();
        assert_eq!(json["metadata"]["total"], 3);
    }

    #[test]
    fn test_sim_error_status_mapping() {
        let err: AppError = SimError::PointNotFound("temp".into()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.error.message, "Point not found: temp");

        let err: AppError = SimError::NotWritable("temp".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error.code, 400);
    }

    #[test]
    fn test_helper_codes_follow_status() {
        let err = AppError::service_unavailable("logging off").with_details("no reload handle");
        assert_eq!(err.error.code, 503);
        assert_eq!(err.error.details.as_deref(), Some("no reload handle"));
    }
}
