pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bucketeer")]
#[command(about = "Web console for browsing and managing S3-compatible buckets")]
pub struct Args {
    /// Path to a config file (defaults to ~/.bucketeer/config.toml when present)
    #[arg(long, global = true, env = "BUCKETEER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
