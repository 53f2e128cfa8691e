//! Wire types for the bridge's HTTP surface.

use serde::{Deserialize, Serialize};

/// Acknowledgement body; the gateway only checks the status code, the body
/// is for humans reading delivery logs.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

impl WebhookAck {
    pub fn ok() -> Self {
        WebhookAck { ok: true }
    }
}

/// Error body for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters on the webhook endpoint. The gateway sometimes appends
/// `topic` to the notify URL instead of putting it in the body.
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub topic: Option<String>,
}

/// Query parameters on the return-redirect endpoint. `id` is the payment
/// transaction id; `path` is the page the buyer was sent back to, when the
/// site proxies the redirect through the bridge.
#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub subscription_id: Option<String>,
    pub id: Option<String>,
    pub path: Option<String>,
}
