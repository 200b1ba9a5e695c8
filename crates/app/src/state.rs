use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "bucketeer";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const BUCKETS_DIR_NAME: &str = "buckets";

/// Backend kind, as named on the command line and in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Local,
    S3,
}

/// Settings read from `config.toml`.
///
/// Every field is optional; the command line overrides whatever is set here
/// and defaults fill in the rest (see [`crate::ServiceConfig`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub store: Option<StoreKind>,
    /// Root directory for the local store
    pub local_root: Option<PathBuf>,
    /// S3 endpoint, `host:port` or a full URL
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_region: Option<String>,
    pub s3_ssl: Option<bool>,
    /// Address for the HTTP server, e.g. `localhost:9001`
    pub bind: Option<String>,
    /// Maximum entries shown per listing
    pub max_objects: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Default location: `~/.bucketeer`
    pub fn app_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Load a config file.
    ///
    /// An explicit path must exist. Without one, `~/.bucketeer/config.toml`
    /// is read if present and an empty config is returned otherwise.
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match custom_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path));
                }
                path
            }
            None => match Self::app_dir() {
                Ok(dir) => dir.join(CONFIG_FILE_NAME),
                Err(_) => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        tracing::debug!(path = %path.display(), "loading config file");
        let config_toml = fs::read_to_string(&path)?;
        let config = toml::from_str(&config_toml)?;
        Ok(config)
    }

    /// Fill every unset field of `self` from `fallback`.
    pub fn or(self, fallback: FileConfig) -> FileConfig {
        FileConfig {
            store: self.store.or(fallback.store),
            local_root: self.local_root.or(fallback.local_root),
            s3_endpoint: self.s3_endpoint.or(fallback.s3_endpoint),
            s3_access_key: self.s3_access_key.or(fallback.s3_access_key),
            s3_secret_key: self.s3_secret_key.or(fallback.s3_secret_key),
            s3_region: self.s3_region.or(fallback.s3_region),
            s3_ssl: self.s3_ssl.or(fallback.s3_ssl),
            bind: self.bind.or(fallback.bind),
            max_objects: self.max_objects.or(fallback.max_objects),
            request_timeout_secs: self.request_timeout_secs.or(fallback.request_timeout_secs),
            log_level: self.log_level.or(fallback.log_level),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDirectory,

    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("max objects must be at least 1")]
    InvalidMaxObjects,
}
