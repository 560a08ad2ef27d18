//! Shared service library for the point simulator
//!
//! Provides the pieces every binary needs:
//! - logging with runtime level reload
//! - API response envelopes and the axum error type
//! - startup banner and bootstrap helpers
//! - graceful shutdown signal handling

pub mod api_types;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

pub use api_types::{
    AppError, ComponentHealth, ErrorInfo, ErrorResponse, HealthStatus, ServiceStatus,
    SuccessResponse,
};

// Re-export common dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;
