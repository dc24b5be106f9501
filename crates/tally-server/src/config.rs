//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use uuid::Uuid;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Server configuration.
///
/// Use [`ServerConfig::builder`] for programmatic construction or
/// [`ServerConfig::from_env`] to read the `TALLY_*` environment knobs.
///
/// # Example
///
/// ```rust
/// use tally_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::builder()
///     .http_addr("127.0.0.1:3000")
///     .request_timeout(Duration::from_secs(10))
///     .build();
///
/// assert_eq!(config.http_addr(), "127.0.0.1:3000");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    backend_id: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Reads configuration from the environment.
    ///
    /// - `TALLY_HTTP_ADDRESS`: bind address, default `0.0.0.0:8080`
    /// - `TALLY_BACKEND_ID`: process identity, default generated
    /// - `TALLY_REQUEST_TIMEOUT_SECS`: per-request timeout, default 30
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::builder();
        if let Ok(addr) = std::env::var("TALLY_HTTP_ADDRESS") {
            builder = builder.http_addr(addr);
        }
        if let Ok(backend_id) = std::env::var("TALLY_BACKEND_ID") {
            builder = builder.backend_id(backend_id);
        }
        if let Some(secs) = std::env::var("TALLY_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
        {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// The HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// The identity this process stamps into `X-Backend-ID`.
    #[must_use]
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// The per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// How long shutdown waits for in-flight connections.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    http_addr: Option<String>,
    backend_id: Option<String>,
    request_timeout: Option<Duration>,
    shutdown_timeout: Option<Duration>,
}

impl ServerConfigBuilder {
    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = Some(addr.into());
        self
    }

    /// Sets the backend identity. When unset, a unique one is generated at
    /// build time.
    #[must_use]
    pub fn backend_id(mut self, backend_id: impl Into<String>) -> Self {
        self.backend_id = Some(backend_id.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Builds the configuration, filling defaults.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self
                .http_addr
                .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            backend_id: self
                .backend_id
                .unwrap_or_else(|| format!("tally-{}", Uuid::now_v7())),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            shutdown_timeout: self
                .shutdown_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert!(config.backend_id().starts_with("tally-"));
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn builder_overrides() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:9000")
            .backend_id("backend-1-build42")
            .request_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.http_addr(), "127.0.0.1:9000");
        assert_eq!(config.backend_id(), "backend-1-build42");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn generated_backend_ids_are_unique() {
        let a = ServerConfig::default();
        let b = ServerConfig::default();
        assert_ne!(a.backend_id(), b.backend_id());
    }
}
