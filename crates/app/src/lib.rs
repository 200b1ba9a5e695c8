// Service modules (HTTP server, process lifecycle)
pub mod http_server;
pub mod process;
pub mod service_config;
pub mod service_state;

// On-disk configuration
pub mod state;

// Re-exports for consumers (the binary, integration tests)
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{ConfigError, FileConfig, StoreKind};
