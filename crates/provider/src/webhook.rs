use hmac::{Hmac, Mac};
use rental_agreements_types::Submission;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::client::{normalize_submission, SubmissionPayload};
use crate::error::ProviderError;

type HmacSha256 = Hmac<Sha256>;

/// Header the provider signs its callbacks with
pub const SIGNATURE_HEADER: &str = "X-Esign-Signature";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("signature verification failed")]
    InvalidSignature,

    #[error("malformed signature header: {0}")]
    MalformedSignature(String),

    #[error("malformed webhook payload: {0}")]
    Malformed(String),
}

impl From<ProviderError> for WebhookError {
    fn from(e: ProviderError) -> Self {
        WebhookError::Malformed(e.to_string())
    }
}

/// A verified, normalized provider callback.
///
/// `event_type` is advisory only - reconciliation always works from the
/// full submission state embedded in the payload, which makes redelivered
/// and out-of-order events safe by construction.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_type: String,
    pub submission: Submission,
}

/// HMAC-SHA256 check over the raw body, constant-time comparison. Must run
/// before any parsing of the payload.
pub fn verify_signature(
    secret: &[u8],
    raw_body: &[u8],
    signature_hex: &str,
) -> Result<(), WebhookError> {
    let signature_hex = signature_hex
        .strip_prefix("sha256=")
        .unwrap_or(signature_hex);

    let signature = hex::decode(signature_hex)
        .map_err(|e| WebhookError::MalformedSignature(e.to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| WebhookError::MalformedSignature(e.to_string()))?;
    mac.update(raw_body);

    mac.verify_slice(&signature)
        .map_err(|_| WebhookError::InvalidSignature)
}

#[derive(Debug, Deserialize)]
struct RawWebhookBody {
    event_type: String,
    data: RawWebhookData,
}

/// The submission arrives either wrapped in a `submission` key or as the
/// data object itself, depending on provider version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawWebhookData {
    Wrapped { submission: SubmissionPayload },
    Direct(SubmissionPayload),
}

/// Parse an already-verified body into a normalized event.
pub fn parse_event(raw_body: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let body: RawWebhookBody =
        serde_json::from_slice(raw_body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

    let payload = match body.data {
        RawWebhookData::Wrapped { submission } => submission,
        RawWebhookData::Direct(payload) => payload,
    };

    let submission = normalize_submission(payload, None)?;

    Ok(WebhookEvent {
        event_type: body.event_type,
        submission,
    })
}
