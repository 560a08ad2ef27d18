use axum::{extract::State, response::Json};
use tracing::info;

use common::{AppError, SuccessResponse};

use crate::api::dto::{LogLevelRequest, LogLevelResponse, TelemetryState};
use crate::api::routes::AppState;

pub async fn get_telemetry(State(state): State<AppState>) -> Json<SuccessResponse<TelemetryState>> {
    Json(SuccessResponse::new(TelemetryState {
        enabled: state.telemetry.is_enabled(),
    }))
}

/// Toggle telemetry publishing; the front-end keeps ticking either way
pub async fn set_telemetry(
    State(state): State<AppState>,
    Json(request): Json<TelemetryState>,
) -> Json<SuccessResponse<TelemetryState>> {
    let previous = state.telemetry.set(request.enabled);
    if previous != request.enabled {
        info!(
            "Telemetry publishing {}",
            if request.enabled { "enabled" } else { "disabled" }
        );
    }
    Json(
        SuccessResponse::new(TelemetryState {
            enabled: request.enabled,
        })
        .with_metadata("previous", serde_json::json!(previous)),
    )
}

pub async fn get_log_level() -> Json<SuccessResponse<LogLevelResponse>> {
    Json(SuccessResponse::new(LogLevelResponse {
        level: common::logging::get_log_level(),
    }))
}

/// Accepts a level ("debug") or a filter directive ("info,simsrv=debug")
pub async fn set_log_level(
    Json(request): Json<LogLevelRequest>,
) -> Result<Json<SuccessResponse<LogLevelResponse>>, AppError> {
    let level = request.level.trim();
    if level.is_empty() {
        return Err(AppError::bad_request("Log level must not be empty"));
    }

    common::logging::set_log_level(level).map_err(|e| {
        if e.starts_with("Invalid log level") {
            AppError::bad_request(e)
        } else {
            AppError::service_unavailable(e)
        }
    })?;

    Ok(Json(SuccessResponse::new(LogLevelResponse {
        level: level.to_string(),
    })))
}
