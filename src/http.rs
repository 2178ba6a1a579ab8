//! Construction of the outbound HTTP client.

use crate::config::HttpConfig;
use std::time::Duration;

/// Builds a `reqwest::Client` from the shared HTTP settings.
pub fn build_client(config: &HttpConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(config.allow_invalid_certs)
        .build()
}
