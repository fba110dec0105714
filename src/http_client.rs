use reqwest::Client;
use std::time::Duration;

use crate::error::ValidationError;

/// Default deadline for a single network hook invocation.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for the HTTP client used by network hooks
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
    /// How long idle pooled connections are kept, in seconds
    pub pool_idle_timeout_seconds: u64,
    /// Maximum idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_HOOK_TIMEOUT.as_millis() as u64,
            user_agent: format!("vast-validator/{}", env!("CARGO_PKG_VERSION")),
            pool_idle_timeout_seconds: 30,
            pool_max_idle_per_host: 10,
        }
    }
}

impl HttpClientConfig {
    /// Build the async client
    pub fn build_client(&self) -> Result<Client, ValidationError> {
        let mut builder = Client::builder()
            .user_agent(&self.user_agent)
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_seconds))
            .pool_max_idle_per_host(self.pool_max_idle_per_host);
        if self.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(self.timeout_ms));
        }
        builder.build().map_err(ValidationError::from)
    }
}

/// HTTP client and per-hook deadline handed to network hooks.
#[derive(Debug, Clone)]
pub struct HttpValidationOptions {
    pub client: Client,
    /// Deadline for each network hook call; zero disables it.
    pub timeout: Duration,
}

impl HttpValidationOptions {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a client from `config` and use its timeout as the hook deadline.
    pub fn from_config(config: &HttpClientConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            client: config.build_client()?,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}
