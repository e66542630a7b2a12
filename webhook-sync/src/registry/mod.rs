//! Remote webhook registry access.
//!
//! This module provides:
//! - Wire types for the Admin API `webhooks.json` endpoints
//! - A typed failure taxonomy (transport / rejected / malformed)
//! - [`RegistryClient`], the `reqwest`-backed accessor
//! - The [`WebhookRegistry`] seam the reconciliation engine is written against

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{RegistryClient, WebhookRegistry};
pub use error::{CreateResult, ListResult, RegistryError};
pub use retry::RetryPolicy;
pub use types::{WebhookFormat, WebhookId, WebhookSubscription, MAX_PAGE_SIZE};
