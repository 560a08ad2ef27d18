//! Request and response bodies for the control API

use serde::{Deserialize, Serialize};

use sensim_model::{Fault, PointKind, PointView, SimulationType, DEFAULT_WRITE_PRIORITY};

fn default_priority() -> i64 {
    i64::from(DEFAULT_WRITE_PRIORITY)
}

/// Row in `GET /points`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSummary {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub writable: bool,
    pub simulation_type: SimulationType,
    pub protocols: Vec<String>,
    pub fault: Option<Fault>,
    pub active_priority: Option<u8>,
}

impl PointSummary {
    pub fn from_view(view: PointView, protocols: Vec<String>) -> Self {
        Self {
            name: view.name,
            value: view.value,
            unit: view.unit,
            writable: view.writable,
            simulation_type: view.simulation_type,
            protocols,
            fault: view.fault,
            active_priority: view.active_priority,
        }
    }
}

/// Body of `GET /points/{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointDetail {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub kind: PointKind,
    pub writable: bool,
    pub simulation_type: SimulationType,
    pub min: f64,
    pub max: f64,
    pub protocols: Vec<String>,
    pub fault: Option<Fault>,
    pub active_priority: Option<u8>,
    /// Slot 0 is priority 1
    pub priority_array: Vec<Option<f64>>,
}

impl PointDetail {
    pub fn from_view(view: PointView, protocols: Vec<String>) -> Self {
        Self {
            priority_array: view.priority_array.slots().to_vec(),
            name: view.name,
            value: view.value,
            unit: view.unit,
            kind: view.kind,
            writable: view.writable,
            simulation_type: view.simulation_type,
            min: view.min,
            max: view.max,
            protocols,
            fault: view.fault,
            active_priority: view.active_priority,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteRequest {
    pub value: f64,
    /// Any integer; levels outside 1..=16 are rejected by the registry
    #[serde(default = "default_priority")]
    pub priority: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAck {
    pub name: String,
    pub priority: i64,
    /// `None` when the slot was relinquished
    pub value: Option<f64>,
}

/// Fault kind stays a string here so unknown kinds become a 400 with a message
#[derive(Debug, Clone, Deserialize)]
pub struct FaultRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultAck {
    pub name: String,
    pub fault: Option<Fault>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryState {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorStatus {
    pub service: String,
    pub version: String,
    pub points: usize,
    pub ticks: u64,
    pub tick_ms: u64,
    pub uptime_seconds: u64,
    pub telemetry_enabled: bool,
    pub frontends: Vec<FrontendStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendStatus {
    pub name: String,
    pub ticks: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLevelRequest {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLevelResponse {
    pub level: String,
}
