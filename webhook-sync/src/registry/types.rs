//! Wire types for the Admin API webhook endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest page the registry returns for a single listing.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Payload encoding the platform uses for deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFormat {
    #[default]
    Json,
    Xml,
    /// Any encoding this client does not know about.
    #[serde(other)]
    Other,
}

/// Registry-assigned identifier. Opaque: numeric or string, never compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WebhookId {
    Number(u64),
    Text(String),
}

impl From<u64> for WebhookId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl fmt::Display for WebhookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// A webhook subscription as stored in the remote registry.
///
/// `(topic, address)` is the natural key. `id` only exists once the registry
/// has accepted the subscription and is never used for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WebhookId>,
    pub topic: String,
    pub address: String,
    #[serde(default)]
    pub format: WebhookFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl WebhookSubscription {
    /// A JSON subscription that has not been registered yet.
    pub fn new(topic: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: None,
            topic: topic.into(),
            address: address.into(),
            format: WebhookFormat::Json,
            api_version: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Exact, case-sensitive match on both topic and address.
    ///
    /// No URL normalization: `https://x.test/hook` and `https://x.test/hook/`
    /// are different addresses.
    pub fn matches(&self, topic: &str, address: &str) -> bool {
        self.topic == topic && self.address == address
    }
}

/// `GET webhooks.json` response body.
///
/// Entries stay raw so one odd entry cannot hide the rest of the page.
#[derive(Debug, Deserialize)]
pub(crate) struct WebhookListEnvelope {
    #[serde(default)]
    pub webhooks: Vec<Value>,
}

impl WebhookListEnvelope {
    /// Decode each entry on its own. Entries that do not decode are returned
    /// as `(index, reason)` in the second list.
    pub fn into_subscriptions(self) -> (Vec<WebhookSubscription>, Vec<(usize, String)>) {
        let mut parsed = Vec::with_capacity(self.webhooks.len());
        let mut skipped = Vec::new();

        for (index, entry) in self.webhooks.into_iter().enumerate() {
            match serde_json::from_value::<WebhookSubscription>(entry) {
                Ok(hook) => parsed.push(hook),
                Err(e) => skipped.push((index, e.to_string())),
            }
        }

        (parsed, skipped)
    }
}

/// `POST webhooks.json` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct WebhookEnvelope {
    pub webhook: WebhookSubscription,
}

/// `POST webhooks.json` request body.
#[derive(Debug, Serialize)]
pub(crate) struct CreateWebhookRequest<'a> {
    pub webhook: NewWebhook<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewWebhook<'a> {
    pub topic: &'a str,
    pub address: &'a str,
    pub format: WebhookFormat,
}
