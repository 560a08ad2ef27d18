use axum::{
    routing::{delete, get, post},
    Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use sensim_model::{Registry, SimulationClock};
use sensim_protocols::{FrontendStats, TelemetrySwitch};

use super::handlers::{admin_handlers, health, point_handlers};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub clock: Arc<SimulationClock>,
    pub telemetry: Arc<TelemetrySwitch>,
    /// Point name to protocol labels, e.g. `Modbus HR:40001`
    pub labels: Arc<BTreeMap<String, Vec<String>>>,
    pub frontends: Arc<Vec<(&'static str, Arc<FrontendStats>)>>,
    pub service_name: String,
    pub started: Instant,
}

impl AppState {
    pub fn new(
        registry: Arc<Registry>,
        clock: Arc<SimulationClock>,
        telemetry: Arc<TelemetrySwitch>,
        labels: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            registry,
            clock,
            telemetry,
            labels: Arc::new(labels),
            frontends: Arc::new(Vec::new()),
            service_name: "simsrv".to_string(),
            started: Instant::now(),
        }
    }

    pub fn with_frontends(mut self, frontends: Vec<(&'static str, Arc<FrontendStats>)>) -> Self {
        self.frontends = Arc::new(frontends);
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn labels_for(&self, name: &str) -> Vec<String> {
        self.labels.get(name).cloned().unwrap_or_default()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Build the control API router
pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/status", get(health::get_status))
        .route("/points", get(point_handlers::list_points))
        .route(
            "/points/{name}",
            get(point_handlers::get_point).post(point_handlers::write_point),
        )
        .route(
            "/points/{name}/priority/{level}",
            delete(point_handlers::relinquish_point),
        )
        .route(
            "/points/{name}/fault",
            post(point_handlers::inject_fault).delete(point_handlers::clear_fault),
        )
        .route(
            "/telemetry",
            get(admin_handlers::get_telemetry).put(admin_handlers::set_telemetry),
        )
        .route(
            "/admin/log-level",
            get(admin_handlers::get_log_level).put(admin_handlers::set_log_level),
        )
        .layer(axum::middleware::from_fn(common::logging::http_request_logger))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
