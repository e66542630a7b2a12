//! Signed synthetic deliveries used to exercise a receiving endpoint.

use serde::Serialize;
use uuid::Uuid;

use crate::signature::{self, HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER, WEBHOOK_ID_HEADER};

/// Topic stamped on probe deliveries unless another is requested.
pub const DEFAULT_PROBE_TOPIC: &str = "products/create";

/// Transport metadata sent next to the body. Not covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryHeaders {
    pub topic: String,
    pub shop_domain: String,
    pub webhook_id: String,
    /// Exact byte length of the signed body
    pub content_length: usize,
}

/// A body plus the signature computed over exactly those bytes.
///
/// Built fresh for each probe and never persisted.
#[derive(Debug, Clone)]
pub struct SignedDelivery {
    raw_body: Vec<u8>,
    signature: String,
    headers: DeliveryHeaders,
}

#[derive(Serialize)]
struct ProbePayload {
    test: bool,
    timestamp: i64,
}

impl SignedDelivery {
    /// Sign `raw_body` as-is and attach headers with a fresh delivery id.
    pub fn new(raw_body: Vec<u8>, topic: &str, shop_domain: &str, secret: &str) -> Self {
        let signature = signature::sign(&raw_body, secret);
        let headers = DeliveryHeaders {
            topic: topic.to_string(),
            shop_domain: shop_domain.to_string(),
            webhook_id: new_delivery_id(),
            content_length: raw_body.len(),
        };

        Self {
            raw_body,
            signature,
            headers,
        }
    }

    /// `{"test":true,"timestamp":<unix millis>}`, signed.
    pub fn synthetic(topic: &str, shop_domain: &str, secret: &str) -> serde_json::Result<Self> {
        let payload = ProbePayload {
            test: true,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let raw_body = serde_json::to_vec(&payload)?;
        Ok(Self::new(raw_body, topic, shop_domain, secret))
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn headers(&self) -> &DeliveryHeaders {
        &self.headers
    }

    /// Header name/value pairs for the outbound request.
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (TOPIC_HEADER, self.headers.topic.clone()),
            (SHOP_DOMAIN_HEADER, self.headers.shop_domain.clone()),
            (WEBHOOK_ID_HEADER, self.headers.webhook_id.clone()),
            (HMAC_HEADER, self.signature.clone()),
        ]
    }

    pub fn verify(&self, secret: &str) -> bool {
        signature::verify(&self.raw_body, &self.signature, secret)
    }
}

/// Unique id for a synthetic delivery.
pub fn new_delivery_id() -> String {
    format!("test-{}", Uuid::new_v4())
}
