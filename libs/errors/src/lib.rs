//! Error type shared by the simulator crates
//!
//! Library crates keep narrow enums (`CommandError`, `MapError`,
//! `FrontendError`, ...) and convert into [`SimError`] where they meet the
//! service. `SimError` knows its HTTP status and how to render itself as an
//! API error body.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Body of the `error` field in API error responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// HTTP status
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-field validation messages
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, Vec<String>>,
}

impl ErrorInfo {
    /// Code defaults to 500
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
            details: None,
            field_errors: HashMap::new(),
        }
    }

    pub fn with_code(self, code: u16) -> Self {
        Self { code, ..self }
    }

    pub fn with_details(self, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..self
        }
    }

    pub fn add_field_error(mut self, field: impl Into<String>, error: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(error.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    // Startup and configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Parse error: {file}: {error}")]
    ParseError { file: String, error: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Control surface
    #[error("Point not found: {0}")]
    PointNotFound(String),

    #[error("Point is not writable: {0}")]
    NotWritable(String),

    #[error("Invalid parameter: {param}: {reason}")]
    InvalidParameter { param: String, reason: String },

    #[error("Out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        value: String,
        min: String,
        max: String,
    },

    // Front-ends
    #[error("Protocol error: {protocol}: {message}")]
    Protocol { protocol: String, message: String },

    #[error("Connection failed: {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;

/// Coarse grouping of [`SimError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something unusable
    Client,
    /// A front-end or its peer misbehaved
    Transport,
    /// Bad files or settings at startup
    Setup,
    Internal,
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PointNotFound(_)
            | Self::NotWritable(_)
            | Self::InvalidParameter { .. }
            | Self::OutOfRange { .. } => ErrorKind::Client,
            Self::Protocol { .. } | Self::ConnectionFailed { .. } => ErrorKind::Transport,
            Self::Configuration(_) | Self::InvalidConfig { .. } | Self::ParseError { .. } => {
                ErrorKind::Setup
            },
            Self::Io(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::PointNotFound(_) => 404,
            _ if self.kind() == ErrorKind::Client => 400,
            Self::ConnectionFailed { .. } => 503,
            Self::Protocol { .. } => 502,
            _ => 500,
        }
    }

    /// Transport failures clear up on their own; everything else needs a fix
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.kind() {
            ErrorKind::Client => tracing::Level::INFO,
            ErrorKind::Transport => tracing::Level::WARN,
            ErrorKind::Setup | ErrorKind::Internal => tracing::Level::ERROR,
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        let info = ErrorInfo::new(self.to_string()).with_code(self.status_code());
        match self {
            Self::InvalidParameter { param, reason } => info.add_field_error(param, reason),
            Self::OutOfRange { min, max, .. } => {
                info.with_details(format!("allowed range: {}..={}", min, max))
            },
            Self::InvalidConfig { field, reason } => info.add_field_error(field, reason),
            _ => info,
        }
    }
}
