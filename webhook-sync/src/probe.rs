//! Tunnel / health probe.
//!
//! Two independent one-shot checks against a public base URL:
//! 1. `GET {base}/health`, logged verbatim
//! 2. `POST {base}/webhooks/shopify/webhooks` with a signed synthetic delivery
//!
//! A failing first step never prevents the second. Nothing is retried.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use tracing::{error, info};

use crate::delivery::SignedDelivery;
use crate::reconcile::GENERIC_WEBHOOK_PATH;

/// Health endpoint path on the public base URL.
pub const HEALTH_PATH: &str = "/health";

/// Result of one probe step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered; status and body exactly as received.
    Response { status: u16, body: String },
    /// The request never got an answer.
    TransportError { message: String },
}

impl ProbeOutcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Response { status, .. } => Some(*status),
            ProbeOutcome::TransportError { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status(), Some(status) if (200..300).contains(&status))
    }
}

/// Both probe results, reported independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub health: ProbeOutcome,
    pub delivery: ProbeOutcome,
    /// Delivery id sent with the signed request
    pub webhook_id: String,
}

/// Probe for one public base URL.
pub struct TunnelProbe {
    client: Client,
    base_url: String,
}

impl TunnelProbe {
    /// `base_url` is used as given; a trailing slash is dropped.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, HEALTH_PATH)
    }

    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.base_url, GENERIC_WEBHOOK_PATH)
    }

    /// Step 1: fetch the health endpoint.
    pub async fn check_health(&self) -> ProbeOutcome {
        let url = self.health_url();
        info!(url = %url, "probe_health_starting");

        let outcome = read_outcome(self.client.get(&url).send().await).await;
        match &outcome {
            ProbeOutcome::Response { status, body } => {
                info!(status_code = status, body = %body, "probe_health_response");
            }
            ProbeOutcome::TransportError { message } => {
                error!(url = %url, error = %message, "probe_health_error");
            }
        }
        outcome
    }

    /// Step 2: post a signed delivery to the generic webhook path.
    pub async fn send_delivery(&self, delivery: &SignedDelivery) -> ProbeOutcome {
        let url = self.webhook_url();
        let headers = delivery.headers();
        info!(
            url = %url,
            topic = %headers.topic,
            webhook_id = %headers.webhook_id,
            content_length = headers.content_length,
            "probe_webhook_starting"
        );

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, headers.content_length);

        for (name, value) in delivery.header_pairs() {
            request = request.header(name, value);
        }

        let response = request.body(delivery.raw_body().to_vec()).send().await;
        let outcome = read_outcome(response).await;
        match &outcome {
            ProbeOutcome::Response { status, body } => {
                info!(status_code = status, body = %body, "probe_webhook_response");
            }
            ProbeOutcome::TransportError { message } => {
                error!(url = %url, error = %message, "probe_webhook_error");
            }
        }
        outcome
    }

    /// Run both steps, the second regardless of the first.
    pub async fn run(&self, delivery: &SignedDelivery) -> ProbeReport {
        let health = self.check_health().await;
        let delivery_outcome = self.send_delivery(delivery).await;

        info!(
            health_status = ?health.status(),
            webhook_status = ?delivery_outcome.status(),
            "probe_complete"
        );

        ProbeReport {
            health,
            delivery: delivery_outcome,
            webhook_id: delivery.headers().webhook_id.clone(),
        }
    }
}

async fn read_outcome(response: reqwest::Result<reqwest::Response>) -> ProbeOutcome {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            return ProbeOutcome::TransportError {
                message: e.to_string(),
            }
        }
    };

    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => ProbeOutcome::Response { status, body },
        Err(e) => ProbeOutcome::TransportError {
            message: e.to_string(),
        },
    }
}
