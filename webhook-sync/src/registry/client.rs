//! `reqwest`-backed accessor for the Admin API webhook registry.

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::error::{CreateResult, ListResult, RegistryError};
use super::retry::RetryPolicy;
use super::types::{
    CreateWebhookRequest, NewWebhook, WebhookEnvelope, WebhookFormat, WebhookListEnvelope,
    MAX_PAGE_SIZE,
};
use crate::config::StoreCredentials;

/// Header carrying the static Admin API token.
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// The two registry operations reconciliation depends on.
pub trait WebhookRegistry {
    /// Read one page of existing subscriptions.
    fn list_subscriptions(&self) -> impl Future<Output = ListResult>;

    /// Create a JSON subscription for `topic` delivering to `address`.
    fn create_subscription(
        &self,
        topic: &str,
        address: &str,
    ) -> impl Future<Output = CreateResult>;
}

/// Admin API webhook registry client.
///
/// Every operation is a single outbound request. Only the listing read is
/// retried, and only when the configured [`RetryPolicy`] allows it.
pub struct RegistryClient {
    http: Client,
    webhooks_url: String,
    access_token: SecretString,
    retry: RetryPolicy,
}

impl RegistryClient {
    pub fn new(http: Client, store: &StoreCredentials<'_>, retry: RetryPolicy) -> Self {
        let webhooks_url = format!(
            "{}/admin/api/{}/webhooks.json",
            admin_base(store.shop_domain),
            store.api_version
        );

        Self {
            http,
            webhooks_url,
            access_token: SecretString::from(store.access_token.expose_secret().to_owned()),
            retry,
        }
    }

    /// Endpoint both operations target.
    pub fn webhooks_url(&self) -> &str {
        &self.webhooks_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), RegistryError> {
        let response = request.send().await.map_err(RegistryError::transport)?;
        let status = response.status();
        let body = response.text().await.map_err(RegistryError::transport)?;
        Ok((status, body))
    }

    async fn list_once(&self) -> ListResult {
        let request = self
            .authorized(self.http.get(&self.webhooks_url))
            .query(&[("limit", MAX_PAGE_SIZE)]);

        let (status, body) = self.send(request).await?;
        if status != StatusCode::OK {
            return Err(RegistryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let envelope = match serde_json::from_str::<WebhookListEnvelope>(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Err(RegistryError::Malformed {
                    status: status.as_u16(),
                    body,
                    reason: e.to_string(),
                })
            }
        };

        let (subscriptions, skipped) = envelope.into_subscriptions();
        for (index, reason) in skipped {
            warn!(index = index, reason = %reason, "registry_list_entry_skipped");
        }
        Ok(subscriptions)
    }
}

impl WebhookRegistry for RegistryClient {
    async fn list_subscriptions(&self) -> ListResult {
        let mut delays = self.retry.delays().into_iter();
        let mut attempt = 1;

        loop {
            debug!(url = %self.webhooks_url, attempt = attempt, "registry_list_request");

            match self.list_once().await {
                Ok(subscriptions) => {
                    info!(
                        count = subscriptions.len(),
                        page_limit = MAX_PAGE_SIZE,
                        attempt = attempt,
                        "registry_list_complete"
                    );
                    if subscriptions.len() >= MAX_PAGE_SIZE as usize {
                        warn!(
                            count = subscriptions.len(),
                            "registry_list_page_full_results_may_be_partial"
                        );
                    }
                    return Ok(subscriptions);
                }
                Err(e) if e.is_retryable() => match delays.next() {
                    Some(delay) => {
                        warn!(
                            error = %e,
                            attempt = attempt,
                            delay_ms = delay.as_millis() as u64,
                            "registry_list_retrying"
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn create_subscription(&self, topic: &str, address: &str) -> CreateResult {
        let payload = CreateWebhookRequest {
            webhook: NewWebhook {
                topic,
                address,
                format: WebhookFormat::Json,
            },
        };

        debug!(topic = %topic, address = %address, "registry_create_request");

        // Not retried: the registry may have accepted a request whose response was lost.
        let request = self.authorized(self.http.post(&self.webhooks_url)).json(&payload);
        let (status, body) = self.send(request).await?;

        if status != StatusCode::CREATED {
            return Err(RegistryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<WebhookEnvelope>(&body) {
            Ok(envelope) => Ok(envelope.webhook),
            Err(e) => Err(RegistryError::Malformed {
                status: status.as_u16(),
                body,
                reason: e.to_string(),
            }),
        }
    }
}

/// Scheme and host for the Admin API.
///
/// A bare shop domain means HTTPS. An explicit `http://` or `https://`
/// prefix is kept as given.
pub fn admin_base(shop_domain: &str) -> String {
    let shop = shop_domain.trim().trim_end_matches('/');
    if shop.starts_with("https://") || shop.starts_with("http://") {
        shop.to_string()
    } else {
        format!("https://{shop}")
    }
}
