//! Configuration module for environment variable parsing.
//!
//! Everything is read once into [`Config`] at startup and handed to the
//! components that need it. Nothing else in the crate touches the process
//! environment.

use std::env;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::registry::RetryPolicy;

/// Admin API version used when `SHOPIFY_API_VERSION` is unset.
pub const DEFAULT_API_VERSION: &str = "2024-10";

/// Application configuration loaded from environment variables.
#[derive(Debug)]
pub struct Config {
    /// Shop domain, e.g. `example.myshopify.com`
    pub shop_domain: Option<String>,

    /// Admin API access token
    pub access_token: Option<SecretString>,

    /// Admin API version segment
    pub api_version: String,

    /// Public base URL the platform delivers to (raw, untrimmed of path)
    pub public_url: Option<String>,

    /// Shared secret used to sign and verify deliveries
    pub webhook_secret: Option<SecretString>,

    /// Optional topic override; all topics go to the generic delivery path
    pub webhook_topics: Option<Vec<String>>,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Retries for the subscription listing read
    pub registry_max_retries: u32,

    /// Delay range in milliseconds between listing retries (min, max)
    pub retry_delay_ms: (u64, u64),

    /// Treat any per-topic failure as fatal for the registration run
    pub reconcile_strict: bool,

    /// User-Agent for outbound requests
    pub user_agent: String,
}

/// Missing or unusable configuration. Each variant maps to its own exit code.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingStore(Vec<&'static str>),

    #[error("missing public base URL; set BACKEND_PUBLIC_URL or pass it as the first argument")]
    MissingPublicUrl,

    #[error("invalid public base URL {value:?}: {reason}")]
    InvalidPublicUrl { value: String, reason: String },

    #[error("missing required environment variable SHOPIFY_WEBHOOK_SECRET")]
    MissingSigningSecret,
}

impl ConfigError {
    /// Process exit code for this class of configuration failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::MissingStore(_) => 1,
            ConfigError::MissingPublicUrl | ConfigError::InvalidPublicUrl { .. } => 2,
            ConfigError::MissingSigningSecret => 3,
        }
    }
}

/// Shop credentials needed to reach the Admin API.
#[derive(Debug, Clone, Copy)]
pub struct StoreCredentials<'a> {
    pub shop_domain: &'a str,
    pub access_token: &'a SecretString,
    pub api_version: &'a str,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| non_empty(lookup(name));

        Config {
            shop_domain: read("SHOPIFY_STORE_DOMAIN"),

            access_token: read("SHOPIFY_ACCESS_TOKEN").map(SecretString::from),

            api_version: read("SHOPIFY_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),

            public_url: read("BACKEND_PUBLIC_URL"),

            webhook_secret: read("SHOPIFY_WEBHOOK_SECRET").map(SecretString::from),

            webhook_topics: read("SHOPIFY_WEBHOOK_TOPICS")
                .map(|raw| parse_csv(&raw))
                .filter(|topics| !topics.is_empty()),

            request_timeout_ms: parse_number(
                "REQUEST_TIMEOUT_MS",
                read("REQUEST_TIMEOUT_MS"),
                8000,
            ),

            registry_max_retries: parse_number(
                "REGISTRY_MAX_RETRIES",
                read("REGISTRY_MAX_RETRIES"),
                0,
            ),

            retry_delay_ms: parse_range(
                "RETRY_DELAY_RANGE_MS",
                read("RETRY_DELAY_RANGE_MS"),
                (500, 2000),
            ),

            reconcile_strict: parse_flag("RECONCILE_STRICT", read("RECONCILE_STRICT")),

            user_agent: read("HTTP_USER_AGENT").unwrap_or_else(|| {
                format!("hooksync/{}", env!("CARGO_PKG_VERSION"))
            }),
        }
    }

    /// Shop domain, token and API version, or every missing variable at once.
    pub fn store_credentials(&self) -> Result<StoreCredentials<'_>, ConfigError> {
        match (self.shop_domain.as_deref(), self.access_token.as_ref()) {
            (Some(shop_domain), Some(access_token)) => Ok(StoreCredentials {
                shop_domain,
                access_token,
                api_version: &self.api_version,
            }),
            (shop, token) => {
                let mut missing = Vec::new();
                if shop.is_none() {
                    missing.push("SHOPIFY_STORE_DOMAIN");
                }
                if token.is_none() {
                    missing.push("SHOPIFY_ACCESS_TOKEN");
                }
                Err(ConfigError::MissingStore(missing))
            }
        }
    }

    /// Shop domain alone, for tools that only stamp it onto deliveries.
    pub fn require_shop_domain(&self) -> Result<&str, ConfigError> {
        self.shop_domain
            .as_deref()
            .ok_or_else(|| ConfigError::MissingStore(vec!["SHOPIFY_STORE_DOMAIN"]))
    }

    /// Validated public base URL without a trailing slash.
    pub fn public_base_url(&self) -> Result<String, ConfigError> {
        match self.public_url.as_deref() {
            Some(raw) => normalize_base_url(raw),
            None => Err(ConfigError::MissingPublicUrl),
        }
    }

    /// Shared delivery signing secret.
    pub fn signing_secret(&self) -> Result<&SecretString, ConfigError> {
        self.webhook_secret
            .as_ref()
            .ok_or(ConfigError::MissingSigningSecret)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.registry_max_retries,
            delay_ms: self.retry_delay_ms,
        }
    }
}

/// Trim a base URL, drop one trailing slash and check it is absolute http(s).
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingPublicUrl);
    }
    let base = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let parsed = Url::parse(base).map_err(|e| ConfigError::InvalidPublicUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidPublicUrl {
            value: raw.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    Ok(base.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };

    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

/// Parse a comma-separated range like "500,5000" into a tuple.
fn parse_range(name: &str, raw: Option<String>, default: (u64, u64)) -> (u64, u64) {
    let Some(raw) = raw else {
        return default;
    };

    let Some((min, max)) = raw.split_once(',') else {
        warn!(env_var = name, value = %raw, "Invalid range format, using default");
        return default;
    };

    match (min.trim().parse::<u64>(), max.trim().parse::<u64>()) {
        (Ok(min), Ok(max)) if min <= max => (min, max),
        _ => {
            warn!(env_var = name, value = %raw, "Invalid range values, using default");
            default
        }
    }
}

fn parse_flag(name: &str, raw: Option<String>) -> bool {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => false,
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        Some(other) => {
            warn!(env_var = name, value = %other, "Invalid flag, using false");
            false
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
