//! Backend selection.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Which store the console talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory storage, lost on exit
    #[default]
    Memory,

    /// Local filesystem; each bucket is a top-level directory under `root`
    Local { root: PathBuf },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// Host and port, e.g. `localhost:9000`; a full URL is accepted too
        endpoint: String,
        access_key: String,
        secret_key: String,
        /// Defaults to `us-east-1`
        #[serde(default)]
        region: Option<String>,
        /// Talk https to the endpoint
        #[serde(default)]
        ssl: bool,
    },
}

impl StoreConfig {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::Local { .. } => "local",
            StoreConfig::S3 { .. } => "s3",
        }
    }
}

/// Endpoint URL for the S3 client. Bare `host:port` endpoints get a scheme
/// picked from `ssl`.
pub(crate) fn endpoint_url(endpoint: &str, ssl: bool) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let scheme = if ssl { "https" } else { "http" };
    format!("{}://{}", scheme, endpoint)
}
