use std::path::PathBuf;

use clap::Args;

use bucketeer::{spawn_service, ConfigError, FileConfig, ServiceConfig, StoreKind};

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Backend to browse [default: s3]
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// Root directory of the local store [default: ~/.bucketeer/buckets]
    #[arg(long)]
    pub local_root: Option<PathBuf>,

    /// S3 endpoint, host:port or a full URL [default: localhost:9000]
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// S3 access key ID [default: minioadmin]
    #[arg(long, env = "S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,

    /// S3 secret access key [default: minioadmin]
    #[arg(long, env = "S3_SECRET_KEY", hide_env_values = true)]
    pub s3_secret_key: Option<String>,

    /// S3 region [default: us-east-1]
    #[arg(long, env = "S3_REGION")]
    pub s3_region: Option<String>,

    /// Talk to the S3 endpoint over TLS; `--s3-ssl false` turns it off [default: false]
    #[arg(
        long,
        env = "S3_SSL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub s3_ssl: Option<bool>,

    /// Binding address [default: localhost:9001]
    #[arg(long, env = "BIND")]
    pub bind: Option<String>,

    /// Maximum number of entries shown per listing [default: 1024]
    #[arg(long, env = "MAX_OBJECTS")]
    pub max_objects: Option<usize>,

    /// Seconds before a request's store work is cancelled [default: 30]
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Log level [default: info]
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Serve {
    /// Flags as a config layer; unset flags leave the file's values alone.
    fn overrides(&self) -> FileConfig {
        FileConfig {
            store: self.store,
            local_root: self.local_root.clone(),
            s3_endpoint: self.s3_endpoint.clone(),
            s3_access_key: self.s3_access_key.clone(),
            s3_secret_key: self.s3_secret_key.clone(),
            s3_region: self.s3_region.clone(),
            s3_ssl: self.s3_ssl,
            bind: self.bind.clone(),
            max_objects: self.max_objects,
            request_timeout_secs: self.request_timeout_secs,
            log_level: self.log_level.clone(),
        }
    }

    pub fn service_config(&self, config_path: Option<PathBuf>) -> Result<ServiceConfig, ServeError> {
        let file = FileConfig::load(config_path)?;
        Ok(ServiceConfig::try_from(self.overrides().or(file))?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("console failed: {0:#}")]
    Failed(anyhow::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = self.service_config(ctx.config_path.clone())?;
        spawn_service(&config).await.map_err(ServeError::Failed)?;
        Ok("console stopped".to_string())
    }
}
