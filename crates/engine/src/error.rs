//! Error types for the engine

use thiserror::Error;

/// A step could not be turned into browser actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("could not determine target URL for navigation step \"{step}\": no URL in the step and testData.baseUrl / testData.url are not provided")]
    MissingUrl { step: String },

    #[error("test step requires '{key}' but testData.{key} is not provided in test case '{test_case}'")]
    MissingTestData { key: String, test_case: String },

    #[error("test step requires an account type but testData.accountType is not provided and none can be inferred from \"{step}\"")]
    MissingAccountType { step: String },

    #[error("no click target could be resolved from \"{step}\"")]
    UnresolvedClickTarget { step: String },
}

impl MappingError {
    pub(crate) fn missing_data(key: &str, test_case: &str) -> Self {
        MappingError::MissingTestData {
            key: key.to_string(),
            test_case: test_case.to_string(),
        }
    }
}

/// The automation gateway could not carry out an action
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("{action} timed out after {timeout_ms} ms")]
    Timeout { action: String, timeout_ms: u64 },

    #[error("{action} failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("browser session is closed")]
    Closed,

    #[error("bridge protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the session can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Launch(_) | GatewayError::Closed)
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Why a single step failed
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Verification(String),

    #[error("{0}")]
    AuthCascade(&'static str),
}
