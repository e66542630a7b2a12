//! Hooksync Register - Idempotent webhook registration.
//!
//! This binary lists the subscriptions already present in the shop's webhook
//! registry, then creates only the `(topic, address)` pairs that are missing.
//! Existing subscriptions are never changed or deleted.

use std::process;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hooksync::util::build_client;
use hooksync::{load_existing, reconcile, Config, ConfigError, RegistryClient, WebhookPlan};

/// The initial listing failed, so nothing could be reconciled.
const EXIT_LIST_FAILED: i32 = 10;

/// Some topics failed and `RECONCILE_STRICT` is set.
const EXIT_PARTIAL_FAILURE: i32 = 11;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("register_starting");

    // Load configuration; missing values end the run before any network call
    let config = Config::from_env();
    let store = config.store_credentials().unwrap_or_else(|e| exit_config(e));
    let base_url = config.public_base_url().unwrap_or_else(|e| exit_config(e));

    info!(
        shop = %store.shop_domain,
        api_version = %store.api_version,
        public_url = %base_url,
        request_timeout_ms = config.request_timeout_ms,
        max_retries = config.registry_max_retries,
        strict = config.reconcile_strict,
        "config_loaded"
    );

    let http = build_client(&config).context("Failed to create HTTP client")?;
    let registry = RegistryClient::new(http, &store, config.retry_policy());
    let plan = WebhookPlan::from_config(&config, &base_url);

    info!(topics = ?plan.topics(), "webhook_registration_starting");

    let existing = match load_existing(&registry).await {
        Ok(subscriptions) => subscriptions,
        Err(e) => {
            error!(
                error = %e,
                status = ?e.status(),
                body = e.body().unwrap_or_default(),
                "registry_list_failed"
            );
            process::exit(EXIT_LIST_FAILED);
        }
    };

    let report = reconcile(&registry, &plan, &existing).await;

    for outcome in &report.outcomes {
        let id = outcome
            .subscription
            .as_ref()
            .and_then(|s| s.id.as_ref())
            .map(ToString::to_string);
        info!(
            topic = %outcome.topic,
            address = %outcome.address,
            created = outcome.created,
            id = ?id,
            failed = outcome.is_failure(),
            "webhook_registration_outcome"
        );
    }

    info!(
        created = report.created_count(),
        existing = report.existing_count(),
        failed = report.failed_count(),
        "webhook_registration_complete"
    );

    if !report.is_complete() {
        if config.reconcile_strict {
            error!(failed_topics = ?report.failed_topics(), "webhook_registration_incomplete");
            process::exit(EXIT_PARTIAL_FAILURE);
        }
        warn!(failed_topics = ?report.failed_topics(), "webhook_registration_incomplete");
    }

    Ok(())
}

fn exit_config(err: ConfigError) -> ! {
    error!(error = %err, exit_code = err.exit_code(), "config_invalid");
    process::exit(err.exit_code());
}
