use axum::{extract::State, response::Json};
use std::collections::HashMap;

use common::{ComponentHealth, HealthStatus, ServiceStatus, SuccessResponse};

use crate::api::dto::{FrontendStatus, SimulatorStatus};
use crate::api::routes::AppState;

/// Health check
pub async fn health_check(State(state): State<AppState>) -> Json<SuccessResponse<HealthStatus>> {
    let mut checks = HashMap::new();

    let registry = if state.registry.is_empty() {
        ComponentHealth::degraded("no points loaded")
    } else {
        ComponentHealth::healthy()
    };
    checks.insert("registry".to_string(), registry);

    let failing: Vec<&str> = state
        .frontends
        .iter()
        .filter(|(_, stats)| stats.ticks() > 0 && stats.errors() == stats.ticks())
        .map(|(name, _)| *name)
        .collect();
    let frontends = if failing.is_empty() {
        ComponentHealth::healthy()
    } else {
        ComponentHealth::degraded(format!("failing: {}", failing.join(", ")))
    };
    checks.insert("frontends".to_string(), frontends);

    let status = if checks
        .values()
        .all(|c| c.status == ServiceStatus::Healthy)
    {
        ServiceStatus::Healthy
    } else {
        ServiceStatus::Degraded
    };

    Json(SuccessResponse::new(HealthStatus {
        status,
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: chrono::Utc::now(),
        checks,
    }))
}

/// Simulator counters
pub async fn get_status(State(state): State<AppState>) -> Json<SuccessResponse<SimulatorStatus>> {
    let frontends = state
        .frontends
        .iter()
        .map(|(name, stats)| FrontendStatus {
            name: (*name).to_string(),
            ticks: stats.ticks(),
            errors: stats.errors(),
        })
        .collect();

    Json(SuccessResponse::new(SimulatorStatus {
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        points: state.registry.len(),
        ticks: state.clock.ticks(),
        tick_ms: state.clock.period().as_millis() as u64,
        uptime_seconds: state.uptime_seconds(),
        telemetry_enabled: state.telemetry.is_enabled(),
        frontends,
    }))
}
