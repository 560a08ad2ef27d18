//! Control API
//!
//! JSON over HTTP for inspecting points, commanding them at a priority,
//! injecting faults and toggling telemetry at runtime.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{create_api_routes, AppState};
