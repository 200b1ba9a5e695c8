//! Errors surfaced to callers of the console and the listing adapter.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Caller-supplied identifiers failed shape checks; no store call was made
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The bucket or object does not exist
    #[error("{op} {target}: not found")]
    NotFound { op: &'static str, target: String },

    /// Network, auth or backend failure while talking to the store
    #[error("{op} {target}: store unavailable: {source}")]
    StoreUnavailable {
        op: &'static str,
        target: String,
        #[source]
        source: StoreError,
    },

    /// The caller went away before the operation finished
    #[error("{op} {target}: cancelled")]
    Cancelled { op: &'static str, target: String },
}

impl ConsoleError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wrap a store error, keeping not-found distinct.
    pub(crate) fn from_store(op: &'static str, target: impl Into<String>, err: StoreError) -> Self {
        let target = target.into();
        match err {
            StoreError::NotFound(_) => Self::NotFound { op, target },
            source => Self::unavailable(op, target, source),
        }
    }

    /// Wrap a store error as a gateway failure, unless the store refused the
    /// caller's input.
    pub(crate) fn unavailable(op: &'static str, target: impl Into<String>, err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(_) | StoreError::SizeMismatch { .. } => {
                Self::InvalidArgument(format!("{} {}: {}", op, target.into(), err))
            }
            source => Self::StoreUnavailable {
                op,
                target: target.into(),
                source,
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConsoleError::Cancelled { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::NotFound { .. })
    }
}

/// `bucket/key` style target used in error context.
pub(crate) fn target(bucket: &str, key: &str) -> String {
    if key.is_empty() {
        bucket.to_string()
    } else {
        format!("{}/{}", bucket, key.trim_start_matches('/'))
    }
}
