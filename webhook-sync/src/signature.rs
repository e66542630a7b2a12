//! Webhook delivery signing and verification.
//!
//! The platform signs every delivery with HMAC-SHA256 over the raw request
//! body, keyed by the shared webhook secret, and sends the base64 digest in
//! the `X-Shopify-Hmac-Sha256` header. Verification must run on the exact
//! body bytes, before any JSON parsing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";
pub const WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";
pub const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";

/// Why a delivery was rejected. All variants are authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("webhook secret is not configured")]
    MissingSecret,

    #[error("delivery carries no signature header")]
    MissingSignature,

    #[error("delivery signature does not match body")]
    Mismatch,
}

/// Base64 HMAC-SHA256 of `raw_body` keyed by `secret`, untruncated.
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(raw_body);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Check `signature` against the MAC of `raw_body`.
///
/// The comparison is constant-time. A signature that is not valid base64
/// never verifies.
pub fn verify(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(provided) = BASE64.decode(signature) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };

    mac.update(raw_body);
    mac.verify_slice(&provided).is_ok()
}

/// Receiver-side check of one delivery.
///
/// A missing (or blank) secret or signature is rejected before any MAC is
/// computed.
pub fn verify_delivery(
    secret: Option<&str>,
    signature_header: Option<&str>,
    raw_body: &[u8],
) -> Result<(), VerifyError> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(VerifyError::MissingSecret)?;
    let signature = signature_header
        .filter(|s| !s.is_empty())
        .ok_or(VerifyError::MissingSignature)?;

    if verify(raw_body, signature, secret) {
        Ok(())
    } else {
        warn!(
            body_length = raw_body.len(),
            signature_length = signature.len(),
            "webhook_signature_mismatch"
        );
        Err(VerifyError::Mismatch)
    }
}
