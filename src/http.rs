use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 100;
pub const DEFAULT_IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);

/// Header GitLab reads personal access tokens from.
pub const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Applies to each request on its own, not to a whole pagination run.
    pub timeout: Duration,
    pub skip_tls_verification: bool,
    pub max_idle_connections: usize,
    pub idle_connection_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            skip_tls_verification: false,
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
            idle_connection_timeout: DEFAULT_IDLE_CONNECTION_TIMEOUT,
        }
    }
}

pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .danger_accept_invalid_certs(config.skip_tls_verification)
        .pool_max_idle_per_host(config.max_idle_connections)
        .pool_idle_timeout(config.idle_connection_timeout)
        .user_agent(concat!("gitlab-migrate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ApiError::Client)
}
