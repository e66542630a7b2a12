//! Hooksync Probe - Public endpoint diagnostic.
//!
//! This binary:
//! 1. Fetches `{base}/health` and logs the answer verbatim
//! 2. Posts a signed synthetic delivery to `{base}/webhooks/shopify/webhooks`
//!
//! Both steps always run. The base URL is the first argument, or
//! `BACKEND_PUBLIC_URL` when no argument is given.

use std::{env, process};

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hooksync::config::normalize_base_url;
use hooksync::util::build_client;
use hooksync::{Config, ConfigError, SignedDelivery, TunnelProbe, DEFAULT_PROBE_TOPIC};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("probe_starting");

    let config = Config::from_env();

    let base_url = match env::args().nth(1).filter(|arg| !arg.trim().is_empty()) {
        Some(arg) => normalize_base_url(&arg),
        None => config.public_base_url(),
    }
    .unwrap_or_else(|e| exit_config(e));

    let secret = config.signing_secret().unwrap_or_else(|e| exit_config(e));
    let shop = config.require_shop_domain().unwrap_or_else(|e| exit_config(e));

    info!(public_url = %base_url, shop = %shop, "config_loaded");

    let http = build_client(&config).context("Failed to create HTTP client")?;
    let delivery = SignedDelivery::synthetic(DEFAULT_PROBE_TOPIC, shop, secret.expose_secret())
        .context("Failed to build probe payload")?;

    let probe = TunnelProbe::new(http, &base_url);
    let report = probe.run(&delivery).await;

    info!(
        health_ok = report.health.is_success(),
        webhook_ok = report.delivery.is_success(),
        webhook_id = %report.webhook_id,
        "probe_finished"
    );

    Ok(())
}

fn exit_config(err: ConfigError) -> ! {
    error!(error = %err, exit_code = err.exit_code(), "config_invalid");
    process::exit(err.exit_code());
}
