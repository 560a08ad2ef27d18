use errors::SimError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
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

    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("duplicate point name: {0}")]
    DuplicatePoint(String),

    #[error("inconsistent projection: {0}")]
    Inconsistent(String),

    #[error("invalid template '{suffix}': {reason}")]
    InvalidTemplate { suffix: String, reason: String },
}

pub type MapResult<T> = Result<T, MapError>;

impl From<MapError> for SimError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::Io { source, .. } => SimError::Io(source),
            MapError::Parse { path, source } => SimError::ParseError {
                file: path.display().to_string(),
                error: source.to_string(),
            },
            other => SimError::Configuration(other.to_string()),
        }
    }
}
