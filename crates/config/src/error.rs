//! Configuration errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("duplicate provider name: {0}")]
    DuplicateProvider(String),

    #[error("provider '{provider}' missing required field: {field}")]
    MissingField { provider: String, field: String },
}
