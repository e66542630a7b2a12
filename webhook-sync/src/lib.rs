//! Hooksync - Shopify webhook registration and delivery signing.
//!
//! This library provides shared modules for the two hooksync binaries:
//! - `hooksync-register`: Creates missing webhook subscriptions
//! - `hooksync-probe`: Checks a public endpoint with a signed test delivery
//!
//! ## Architecture
//!
//! ```text
//! Config → RegistryClient (list) → reconcile() (create gaps)
//! Config → SignedDelivery (sign) → TunnelProbe (health + POST)
//! ```

pub mod config;
pub mod delivery;
pub mod probe;
pub mod reconcile;
pub mod registry;
pub mod signature;
pub mod util;

// Re-export commonly used types
pub use config::{Config, ConfigError, StoreCredentials};
pub use delivery::{SignedDelivery, DEFAULT_PROBE_TOPIC};
pub use probe::{ProbeOutcome, ProbeReport, TunnelProbe};
pub use reconcile::{
    load_existing, reconcile, reconcile_topics, ReconcileReport, TopicOutcome, WebhookPlan,
};
pub use registry::{
    RegistryClient, RegistryError, RetryPolicy, WebhookRegistry, WebhookSubscription,
};
pub use signature::{sign, verify, verify_delivery, VerifyError};
