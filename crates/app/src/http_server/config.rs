use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address, resolved when the listener is bound
    pub listen_addr: String,
    // Requests still running after this long have their store work cancelled
    pub request_timeout: Duration,
    // log level for http tracing
    pub log_level: tracing::Level,
}

impl Config {
    pub fn new(listen_addr: impl Into<String>, request_timeout: Duration) -> Self {
        let listen_addr = listen_addr.into();
        tracing::debug!(
            "Creating HTTP server Config: listen_addr={}, request_timeout={:?}",
            listen_addr,
            request_timeout
        );
        Self {
            listen_addr,
            request_timeout,
            log_level: tracing::Level::INFO,
        }
    }

    pub fn with_log_level(mut self, log_level: tracing::Level) -> Self {
        self.log_level = log_level;
        self
    }
}
