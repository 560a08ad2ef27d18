//! Error types for the point model

use errors::SimError;
use std::path::PathBuf;
use thiserror::Error;

/// Rejection of a command addressed to a point by name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("point not found: {0}")]
    NotFound(String),

    #[error("point is not writable: {0}")]
    NotWritable(String),

    #[error("priority {0} out of range 1..=16")]
    OutOfRange(i64),
}

/// Point set configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid point '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("point set is empty")]
    Empty,
}

/// Unknown fault kind string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fault kind '{0}' (expected freeze, offset, noise or spike)")]
pub struct UnknownFaultKind(pub String);

/// Unknown simulation type string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown simulation type '{0}'")]
pub struct UnknownSimulationType(pub String);

pub type ModelResult<T> = Result<T, ConfigError>;

impl From<CommandError> for SimError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound(name) => SimError::PointNotFound(name),
            CommandError::NotWritable(name) => SimError::NotWritable(name),
            CommandError::OutOfRange(level) => SimError::OutOfRange {
                value: level.to_string(),
                min: "1".to_string(),
                max: "16".to_string(),
            },
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { source, .. } => SimError::Io(source),
            ConfigError::Parse { path, source } => SimError::ParseError {
                file: path.display().to_string(),
                error: source.to_string(),
            },
            ConfigError::Invalid { name, reason } => SimError::InvalidConfig {
                field: name,
                reason,
            },
            ConfigError::Empty => SimError::Configuration("point set is empty".to_string()),
        }
    }
}

impl From<UnknownFaultKind> for SimError {
    fn from(err: UnknownFaultKind) -> Self {
        SimError::InvalidParameter {
            param: "type".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_maps_to_http_status() {
        assert_eq!(
            SimError::from(CommandError::NotFound("x".into())).status_code(),
            404
        );
        assert_eq!(
            SimError::from(CommandError::NotWritable("x".into())).status_code(),
            400
        );
        assert_eq!(SimError::from(CommandError::OutOfRange(17)).status_code(), 400);
    }
}
