//! Port for reading resources from the payment gateway's REST API.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a gateway API implementation.
///
/// Per-candidate transport failures are absorbed inside the implementation
/// (they just advance the probe); this error is reserved for conditions that
/// make probing impossible at all, such as missing credentials.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway client misconfigured: {0}")]
    Misconfigured(String),
}

/// Read access to gateway resources (`customers`, `subscriptions`, ...).
///
/// `Ok(None)` means "information unavailable" and is an expected steady-state
/// outcome: callers degrade to their documented fallback rather than fail.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Fetches one resource by id, returning the decoded JSON object body of
    /// the first successful candidate, or `None` when every candidate was
    /// exhausted.
    async fn fetch_resource(&self, resource: &str, id: &str)
        -> Result<Option<Value>, GatewayError>;
}
