//! qaflow Common Library
//!
//! Shared data model, configuration and suite loading for the qaflow
//! natural-language browser test engine.

pub mod config;
pub mod error;
pub mod suite;
pub mod types;

// Re-export commonly used types
pub use config::{
    ApplicationConfig, AuthSignatures, Browser, CredentialSets, EngineConfig, GatewayConfig, PacingConfig,
    SelectorConfig,
};
pub use error::{Error, Result};
pub use suite::Suite;
pub use types::*;

/// qaflow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file looked up by the CLI
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from("qaflow.toml")
}
