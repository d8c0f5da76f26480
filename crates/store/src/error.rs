//! Store errors

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store operation timed out")]
    Timeout,

    #[error("store serialization error: {0}")]
    Serialization(String),

    #[error("store internal error: {0}")]
    Internal(String),
}
