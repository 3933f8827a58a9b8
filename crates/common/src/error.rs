//! Error types for qaflow

use thiserror::Error;

/// Result type alias using qaflow Error
pub type Result<T> = std::result::Result<T, Error>;

/// qaflow error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid test suite {path}: {reason}")]
    InvalidSuite { path: String, reason: String },

    #[error("Unsupported suite format: {0}")]
    UnsupportedFormat(String),

    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },
}

impl Error {
    pub(crate) fn invalid_suite(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Error::InvalidSuite {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}
