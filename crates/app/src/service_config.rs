use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use object_store::StoreConfig;

use crate::state::{ConfigError, FileConfig, StoreKind, BUCKETS_DIR_NAME};

pub const DEFAULT_S3_ENDPOINT: &str = "localhost:9000";
pub const DEFAULT_S3_ACCESS_KEY: &str = "minioadmin";
pub const DEFAULT_S3_SECRET_KEY: &str = "minioadmin";
pub const DEFAULT_BIND: &str = "localhost:9001";
pub const DEFAULT_MAX_OBJECTS: usize = 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    // store configuration
    /// backend the console talks to
    pub store: StoreConfig,

    // http server configuration
    /// address for the HTTP server, resolved at bind time
    pub listen_addr: String,
    /// upper bound on entries returned by a single listing
    pub max_objects: NonZeroUsize,
    /// requests still running after this long are cancelled
    pub request_timeout: Duration,

    // logging
    pub log_level: tracing::Level,
}

impl TryFrom<FileConfig> for Config {
    type Error = ConfigError;

    fn try_from(file: FileConfig) -> Result<Self, Self::Error> {
        let store = match file.store.unwrap_or(StoreKind::S3) {
            StoreKind::Memory => StoreConfig::Memory,
            StoreKind::Local => {
                let root = match file.local_root {
                    Some(root) => root,
                    None => FileConfig::app_dir()?.join(BUCKETS_DIR_NAME),
                };
                StoreConfig::Local { root }
            }
            StoreKind::S3 => StoreConfig::S3 {
                endpoint: file
                    .s3_endpoint
                    .unwrap_or_else(|| DEFAULT_S3_ENDPOINT.to_string()),
                access_key: file
                    .s3_access_key
                    .unwrap_or_else(|| DEFAULT_S3_ACCESS_KEY.to_string()),
                secret_key: file
                    .s3_secret_key
                    .unwrap_or_else(|| DEFAULT_S3_SECRET_KEY.to_string()),
                region: file.s3_region,
                ssl: file.s3_ssl.unwrap_or(false),
            },
        };

        let max_objects = NonZeroUsize::new(file.max_objects.unwrap_or(DEFAULT_MAX_OBJECTS))
            .ok_or(ConfigError::InvalidMaxObjects)?;

        let log_level = match file.log_level {
            Some(level) => {
                tracing::Level::from_str(&level).map_err(|_| ConfigError::InvalidLogLevel(level))?
            }
            None => tracing::Level::INFO,
        };

        Ok(Self {
            store,
            listen_addr: file.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            max_objects,
            request_timeout: Duration::from_secs(
                file.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            log_level,
        })
    }
}
