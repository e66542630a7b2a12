//! Outbound HTTP client construction.

use reqwest::Client;

use crate::config::Config;

/// Build the one HTTP client shared by every component of a run.
///
/// Timeout and User-Agent come from config, so no request relies on
/// transport defaults.
pub fn build_client(config: &Config) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.as_str())
        .build()
}
