//! Failure taxonomy for registry calls.

use thiserror::Error;

use super::types::WebhookSubscription;

/// Why a registry call did not produce the expected data.
///
/// Transport failures, application rejections and malformed bodies stay
/// distinct so callers can tell "never reached the registry" apart from
/// "the registry said no".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    #[error("registry rejected request with status {status}")]
    Rejected { status: u16, body: String },

    #[error("malformed registry response (status {status}): {reason}")]
    Malformed {
        status: u16,
        body: String,
        reason: String,
    },
}

impl RegistryError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        RegistryError::Transport {
            message: err.to_string(),
            timeout: err.is_timeout(),
        }
    }

    /// HTTP status when the registry answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Transport { .. } => None,
            RegistryError::Rejected { status, .. } | RegistryError::Malformed { status, .. } => {
                Some(*status)
            }
        }
    }

    /// Raw response body kept for diagnostics.
    pub fn body(&self) -> Option<&str> {
        match self {
            RegistryError::Transport { .. } => None,
            RegistryError::Rejected { body, .. } | RegistryError::Malformed { body, .. } => {
                Some(body)
            }
        }
    }

    /// Transient failures worth another attempt on an idempotent read.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Transport { .. } => true,
            RegistryError::Rejected { status, .. } => *status == 429 || *status >= 500,
            RegistryError::Malformed { .. } => false,
        }
    }
}

/// Outcome of listing subscriptions.
pub type ListResult = Result<Vec<WebhookSubscription>, RegistryError>;

/// Outcome of creating one subscription.
pub type CreateResult = Result<WebhookSubscription, RegistryError>;
