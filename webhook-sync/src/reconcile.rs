//! Reconciliation of desired webhook subscriptions against the registry.
//!
//! Converges the remote registry toward a [`WebhookPlan`] by creating only
//! the missing `(topic, address)` pairs. Nothing is ever deleted or updated.
//!
//! ## Processing Flow
//!
//! ```text
//! current list (read once) + plan → reconcile() → ReconcileReport
//! ```

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::registry::{RegistryError, WebhookRegistry, WebhookSubscription};

/// Generic delivery path shared by topics without a dedicated endpoint.
pub const GENERIC_WEBHOOK_PATH: &str = "/webhooks/shopify/webhooks";

/// Default topic routing, relative to the public base URL.
pub const DEFAULT_ROUTES: &[(&str, &str)] = &[
    ("orders/create", "/api/orders"),
    ("orders/updated", "/api/orders/updated"),
    ("orders/cancelled", "/api/orders/cancelled"),
    ("fulfillments/create", "/api/fulfillments/create"),
    ("fulfillments/update", "/api/fulfillments/update"),
    ("app/uninstalled", "/api/app/uninstalled"),
    ("inventory_levels/update", "/api/inventory"),
    ("products/update", "/api/products"),
    ("orders/fulfilled", GENERIC_WEBHOOK_PATH),
    ("products/create", GENERIC_WEBHOOK_PATH),
    ("products/delete", GENERIC_WEBHOOK_PATH),
];

/// One subscription the operator wants to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSubscription {
    pub topic: String,
    pub address: String,
}

/// Ordered set of desired subscriptions.
///
/// Order only decides processing order. A repeated `(topic, address)` pair
/// is dropped on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookPlan {
    entries: Vec<DesiredSubscription>,
}

impl WebhookPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every topic delivered to the same address.
    pub fn single_address<I, S>(topics: I, address: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut plan = Self::new();
        for topic in topics {
            plan.push(topic, address);
        }
        plan
    }

    /// The built-in routing table under `base_url`.
    pub fn default_routes(base_url: &str) -> Self {
        let mut plan = Self::new();
        for (topic, path) in DEFAULT_ROUTES {
            plan.push(*topic, format!("{base_url}{path}"));
        }
        plan
    }

    /// Topic override from config when present, default routing otherwise.
    pub fn from_config(config: &Config, base_url: &str) -> Self {
        match &config.webhook_topics {
            Some(topics) => Self::single_address(
                topics.iter().cloned(),
                &format!("{base_url}{GENERIC_WEBHOOK_PATH}"),
            ),
            None => Self::default_routes(base_url),
        }
    }

    /// Append a pair; returns false when it was already planned.
    pub fn push(&mut self, topic: impl Into<String>, address: impl Into<String>) -> bool {
        let entry = DesiredSubscription {
            topic: topic.into(),
            address: address.into(),
        };

        if self.entries.contains(&entry) {
            debug!(topic = %entry.topic, address = %entry.address, "plan_duplicate_ignored");
            return false;
        }

        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[DesiredSubscription] {
        &self.entries
    }

    pub fn topics(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.topic.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What happened to one desired subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicOutcome {
    pub topic: String,
    pub address: String,
    /// True only when this run created the subscription.
    pub created: bool,
    /// The existing or newly created subscription; `None` on failure.
    pub subscription: Option<WebhookSubscription>,
    /// Why creation failed, kept for diagnostics.
    pub error: Option<RegistryError>,
}

impl TopicOutcome {
    pub fn is_failure(&self) -> bool {
        self.subscription.is_none()
    }
}

/// Per-entry outcomes of one reconciliation run, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcomes: Vec<TopicOutcome>,
}

impl ReconcileReport {
    pub fn created_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.created).count()
    }

    pub fn existing_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !o.created && !o.is_failure())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Every desired subscription now exists.
    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn failed_topics(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.topic.as_str())
            .collect()
    }
}

/// Find an existing subscription by exact topic and address.
pub fn find_existing<'a>(
    existing: &'a [WebhookSubscription],
    topic: &str,
    address: &str,
) -> Option<&'a WebhookSubscription> {
    existing.iter().find(|w| w.matches(topic, address))
}

/// Read the current subscriptions a run starts from.
///
/// A `200` whose body cannot be decoded counts as an empty registry, with a
/// warning. Any other listing failure is returned and the run must stop.
pub async fn load_existing<R: WebhookRegistry>(
    registry: &R,
) -> Result<Vec<WebhookSubscription>, RegistryError> {
    match registry.list_subscriptions().await {
        Ok(subscriptions) => Ok(subscriptions),
        Err(RegistryError::Malformed {
            status: 200, reason, ..
        }) => {
            warn!(reason = %reason, "registry_list_unparseable_treated_as_empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Converge the registry toward `plan`.
///
/// Entries are resolved one at a time, in order. A failed create is recorded
/// and the next entry is still attempted; the caller decides whether partial
/// failure matters. `existing` is the listing taken before the run and is
/// not updated while the run progresses.
pub async fn reconcile<R: WebhookRegistry>(
    registry: &R,
    plan: &WebhookPlan,
    existing: &[WebhookSubscription],
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for desired in plan.entries() {
        let outcome = ensure_subscription(registry, desired, existing).await;
        report.outcomes.push(outcome);
    }

    info!(
        planned = plan.len(),
        existing = report.existing_count(),
        created = report.created_count(),
        failed = report.failed_count(),
        "reconcile_complete"
    );

    report
}

/// Single-address form: every topic in `topics` at `address`.
pub async fn reconcile_topics<R: WebhookRegistry>(
    registry: &R,
    topics: &[&str],
    address: &str,
    existing: &[WebhookSubscription],
) -> ReconcileReport {
    let plan = WebhookPlan::single_address(topics.iter().copied(), address);
    reconcile(registry, &plan, existing).await
}

async fn ensure_subscription<R: WebhookRegistry>(
    registry: &R,
    desired: &DesiredSubscription,
    existing: &[WebhookSubscription],
) -> TopicOutcome {
    let DesiredSubscription { topic, address } = desired;

    if let Some(found) = find_existing(existing, topic, address) {
        info!(topic = %topic, address = %address, id = ?found.id, "webhook_exists");
        return TopicOutcome {
            topic: topic.clone(),
            address: address.clone(),
            created: false,
            subscription: Some(found.clone()),
            error: None,
        };
    }

    match registry.create_subscription(topic, address).await {
        Ok(created) => {
            info!(topic = %topic, address = %address, id = ?created.id, "webhook_created");
            TopicOutcome {
                topic: topic.clone(),
                address: address.clone(),
                created: true,
                subscription: Some(created),
                error: None,
            }
        }
        Err(e) => {
            error!(
                topic = %topic,
                address = %address,
                error = %e,
                status = ?e.status(),
                body = e.body().unwrap_or_default(),
                "webhook_create_failed"
            );
            TopicOutcome {
                topic: topic.clone(),
                address: address.clone(),
                created: false,
                subscription: None,
                error: Some(e),
            }
        }
    }
}
