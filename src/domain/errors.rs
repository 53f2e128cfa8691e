//! Error taxonomy for webhook and return-flow processing.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while handling an inbound webhook.
///
/// The status-code mapping encodes the acknowledgement policy: the gateway
/// redelivers on non-2xx, but a redelivery carries no extra context, so
/// signature-valid events are acknowledged with 200 even when local
/// processing failed (the failure is logged for operator follow-up).
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing or HMAC mismatch.
    #[error("invalid signature")]
    InvalidSignature,

    /// Body was not parseable as a JSON object.
    #[error("unparseable payload: {0}")]
    UnparseablePayload(String),

    /// Membership store rejected a read or write.
    #[error("store error: {0}")]
    Store(String),

    /// Gateway API lookup failed at the transport level for every candidate
    /// where a result was required. Resolution gaps normally degrade to
    /// fallbacks instead of raising this.
    #[error("gateway error: {0}")]
    Gateway(String),
}

impl WebhookError {
    /// HTTP status the webhook endpoint answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Rejected at the boundary, before any state mutation.
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,

            // Structurally broken request.
            WebhookError::UnparseablePayload(_) => StatusCode::BAD_REQUEST,

            // Signature-valid events are acknowledged; see module docs.
            WebhookError::Store(_) | WebhookError::Gateway(_) => StatusCode::OK,
        }
    }
}
