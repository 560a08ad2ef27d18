use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::info;

use common::{AppError, SuccessResponse};
use errors::SimError;
use sensim_model::FaultKind;

use crate::api::dto::{CommandAck, FaultAck, FaultRequest, PointDetail, PointSummary, WriteRequest};
use crate::api::routes::AppState;

fn point_not_found(name: &str) -> AppError {
    SimError::PointNotFound(name.to_string()).into()
}

/// List all points sorted by name
pub async fn list_points(
    State(state): State<AppState>,
) -> Json<SuccessResponse<Vec<PointSummary>>> {
    let points: Vec<PointSummary> = state
        .registry
        .views()
        .into_iter()
        .map(|view| {
            let labels = state.labels_for(&view.name);
            PointSummary::from_view(view, labels)
        })
        .collect();

    let total = points.len();
    Json(SuccessResponse::new(points).with_metadata("total", serde_json::json!(total)))
}

pub async fn get_point(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<PointDetail>>, AppError> {
    let view = state
        .registry
        .view(&name)
        .ok_or_else(|| point_not_found(&name))?;
    let labels = state.labels_for(&name);
    Ok(Json(SuccessResponse::new(PointDetail::from_view(view, labels))))
}

/// Command a value at a priority (default 16)
pub async fn write_point(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<WriteRequest>,
) -> Result<Json<SuccessResponse<CommandAck>>, AppError> {
    state
        .registry
        .command(&name, request.priority, Some(request.value))
        .map_err(SimError::from)?;

    info!(
        "Point {} commanded to {} at priority {}",
        name, request.value, request.priority
    );
    Ok(Json(SuccessResponse::new(CommandAck {
        name,
        priority: request.priority,
        value: Some(request.value),
    })))
}

/// Relinquish one priority slot
pub async fn relinquish_point(
    Path((name, level)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<CommandAck>>, AppError> {
    let level: i64 = level.parse().map_err(|_| SimError::InvalidParameter {
        param: "level".to_string(),
        reason: format!("'{}' is not an integer priority", level),
    })?;
    state
        .registry
        .command(&name, level, None)
        .map_err(SimError::from)?;

    info!("Point {} relinquished at priority {}", name, level);
    Ok(Json(SuccessResponse::new(CommandAck {
        name,
        priority: level,
        value: None,
    })))
}

pub async fn inject_fault(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<FaultRequest>,
) -> Result<Json<SuccessResponse<FaultAck>>, AppError> {
    let kind: FaultKind = request.kind.parse().map_err(SimError::from)?;
    state
        .registry
        .set_fault(&name, kind, request.value)
        .map_err(SimError::from)?;

    info!("Fault {} injected on {} (value {:?})", kind, name, request.value);
    let fault = state.registry.view(&name).and_then(|v| v.fault);
    Ok(Json(SuccessResponse::new(FaultAck { name, fault })))
}

pub async fn clear_fault(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<FaultAck>>, AppError> {
    state
        .registry
        .clear_fault(&name)
        .map_err(SimError::from)?;

    info!("Fault cleared on {}", name);
    Ok(Json(SuccessResponse::new(FaultAck { name, fault: None })))
}
