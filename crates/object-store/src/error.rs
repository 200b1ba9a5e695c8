//! Error types for the store backends.

use common::prelude::StoreError;

/// Errors raised while setting a backend up.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for backend setup.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Map an `object_store` failure onto the store contract.
pub(crate) fn store_error(err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
        other => StoreError::with_source("object storage request failed", other),
    }
}

pub(crate) fn io_error(context: &str, err: std::io::Error) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound(context.to_string())
    } else {
        StoreError::with_source(format!("{}: filesystem error", context), err)
    }
}
