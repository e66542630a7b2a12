//! Throwaway HTTP servers standing in for the webhook registry and for a
//! delivery receiver.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};

use hooksync::signature::{verify_delivery, HMAC_HEADER, TOPIC_HEADER, WEBHOOK_ID_HEADER};
use hooksync::{RegistryClient, RetryPolicy, StoreCredentials};

pub const API_VERSION: &str = "2024-10";
pub const ACCESS_TOKEN: &str = "shpat_test_token";

/// Serve `router` on an ephemeral localhost port.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

// =============================================================================
// Fake registry
// =============================================================================

#[derive(Default)]
pub struct RegistryData {
    pub webhooks: Vec<Value>,
    pub create_calls: Vec<String>,
    pub list_calls: usize,
    pub list_limits: Vec<Option<String>>,
    pub tokens: Vec<String>,
    pub reject_topics: Vec<String>,
    /// Answer every listing with this status and body instead of the store
    pub list_override: Option<(u16, String)>,
    /// Answer this many listings with 503 before behaving normally
    pub list_failures: usize,
}

#[derive(Clone, Default)]
pub struct FakeRegistry {
    pub data: Arc<Mutex<RegistryData>>,
}

impl FakeRegistry {
    pub fn with_existing(webhooks: Vec<Value>) -> Self {
        let registry = Self::default();
        registry.data.lock().unwrap().webhooks = webhooks;
        registry
    }

    pub fn router(&self) -> Router {
        let path = format!("/admin/api/{API_VERSION}/webhooks.json");
        Router::new()
            .route(&path, get(list_webhooks).post(create_webhook))
            .with_state(self.clone())
    }

    pub async fn start(&self) -> SocketAddr {
        spawn(self.router()).await
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.data.lock().unwrap().create_calls.clone()
    }
}

fn record_token(data: &mut RegistryData, headers: &HeaderMap) {
    let token = headers
        .get("X-Shopify-Access-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    data.tokens.push(token);
}

async fn list_webhooks(
    State(registry): State<FakeRegistry>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut data = registry.data.lock().unwrap();
    record_token(&mut data, &headers);
    data.list_calls += 1;
    data.list_limits.push(query.get("limit").cloned());

    if data.list_failures > 0 {
        data.list_failures -= 1;
        return (StatusCode::SERVICE_UNAVAILABLE, "try later").into_response();
    }

    if let Some((status, body)) = &data.list_override {
        let status = StatusCode::from_u16(*status).unwrap();
        return (status, body.clone()).into_response();
    }

    Json(json!({ "webhooks": data.webhooks })).into_response()
}

async fn create_webhook(
    State(registry): State<FakeRegistry>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = registry.data.lock().unwrap();
    record_token(&mut data, &headers);

    let topic = body["webhook"]["topic"].as_str().unwrap_or_default().to_string();
    let address = body["webhook"]["address"].as_str().unwrap_or_default().to_string();
    let format = body["webhook"]["format"].clone();
    data.create_calls.push(topic.clone());

    if data.reject_topics.contains(&topic) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": { "topic": ["Invalid topic specified."] } })),
        )
            .into_response();
    }

    let hook = json!({
        "id": 1000 + data.webhooks.len() as u64,
        "topic": topic,
        "address": address,
        "format": format,
        "api_version": API_VERSION,
    });
    data.webhooks.push(hook.clone());

    (StatusCode::CREATED, Json(json!({ "webhook": hook }))).into_response()
}

/// Registry client pointed at a local fake.
pub fn registry_client(addr: SocketAddr, retry: RetryPolicy) -> RegistryClient {
    let shop = format!("http://{addr}");
    let token = SecretString::from(ACCESS_TOKEN.to_string());
    let store = StoreCredentials {
        shop_domain: &shop,
        access_token: &token,
        api_version: API_VERSION,
    };
    RegistryClient::new(reqwest::Client::new(), &store, retry)
}

// =============================================================================
// Fake receiver
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReceivedDelivery {
    pub body: Vec<u8>,
    pub topic: Option<String>,
    pub webhook_id: Option<String>,
    pub content_length: Option<String>,
    pub content_type: Option<String>,
    pub accepted: bool,
}

#[derive(Clone)]
pub struct FakeReceiver {
    pub secret: Option<String>,
    pub received: Arc<Mutex<Vec<ReceivedDelivery>>>,
}

impl FakeReceiver {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Some(secret.to_string()),
            received: Arc::default(),
        }
    }

    /// Receiver with `/health` and the webhook path.
    pub fn router(&self) -> Router {
        self.webhook_only_router()
            .merge(Router::new().route("/health", get(|| async { "ok" })))
    }

    /// Receiver without a health route.
    pub fn webhook_only_router(&self) -> Router {
        Router::new()
            .route("/webhooks/shopify/webhooks", post(receive_webhook))
            .with_state(self.clone())
    }

    pub fn received(&self) -> Vec<ReceivedDelivery> {
        self.received.lock().unwrap().clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn receive_webhook(
    State(receiver): State<FakeReceiver>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Verify on the raw bytes before anything looks at the JSON.
    let signature = header(&headers, HMAC_HEADER);
    let verdict = verify_delivery(receiver.secret.as_deref(), signature.as_deref(), &body);

    receiver.received.lock().unwrap().push(ReceivedDelivery {
        body: body.to_vec(),
        topic: header(&headers, TOPIC_HEADER),
        webhook_id: header(&headers, WEBHOOK_ID_HEADER),
        content_length: header(&headers, "content-length"),
        content_type: header(&headers, "content-type"),
        accepted: verdict.is_ok(),
    });

    match verdict {
        Ok(()) => {
            let _payload: Value = serde_json::from_slice(&body).unwrap();
            (StatusCode::OK, "OK").into_response()
        }
        Err(_) => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}
