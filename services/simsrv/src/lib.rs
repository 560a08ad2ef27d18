//! Building-automation point simulator service
//!
//! Runs a shared point registry behind three protocol front-ends (register
//! server, object store, MQTT telemetry) and a JSON control API.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod runtime;

pub use config::SimConfig;
pub use runtime::Simulator;
