pub mod utils;

use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server;
use crate::{ServiceConfig, ServiceState};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle for gracefully shutting down the service.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    server: tokio::task::JoinHandle<()>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown).
    pub async fn wait(self) -> anyhow::Result<()> {
        let _ = self.graceful_waiter.await;

        timeout(FINAL_SHUTDOWN_TIMEOUT, self.server)
            .await
            .with_context(|| {
                format!(
                    "failed to shut down within {} seconds",
                    FINAL_SHUTDOWN_TIMEOUT.as_secs()
                )
            })?
            .context("HTTP server task failed")?;
        Ok(())
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Initialize logging, panic handler, and build info reporting.
/// The returned guard must be kept alive for the duration of the program.
fn init_logging(service_config: &ServiceConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_env_filter = EnvFilter::builder()
        .with_default_directive(service_config.log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(stdout_env_filter);

    tracing_subscriber::registry().with(stdout_layer).init();

    utils::register_panic_logger();
    utils::report_build_info();

    stdout_guard
}

/// Connect the store and spawn the HTTP server.
pub async fn start_service(
    service_config: &ServiceConfig,
) -> anyhow::Result<(ServiceState, ShutdownHandle)> {
    let (graceful_waiter, shutdown_tx, shutdown_rx) =
        utils::graceful_shutdown_blocker().context("installing signal handlers")?;

    let state = ServiceState::from_config(service_config)
        .await
        .context("creating server state")?;

    let http_config = http_server::Config::new(
        service_config.listen_addr.clone(),
        service_config.request_timeout,
    )
    .with_log_level(service_config.log_level);
    let http_state = state.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = http_server::run(http_config, http_state, shutdown_rx).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tracing::info!(
        addr = %service_config.listen_addr,
        max_objects = service_config.max_objects.get(),
        "console running"
    );

    let handle = ShutdownHandle {
        graceful_waiter,
        server,
        shutdown_tx,
    };

    Ok((state, handle))
}

/// Runs the service until a shutdown signal is received. Use for CLI binary
/// usage.
pub async fn spawn_service(service_config: &ServiceConfig) -> anyhow::Result<()> {
    let _guard = init_logging(service_config);
    let (_, handle) = start_service(service_config).await?;
    handle.wait().await
}
