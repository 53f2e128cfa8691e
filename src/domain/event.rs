//! Webhook event model and payload field extraction.
//!
//! Payku has shipped several webhook payload shapes over its lifetime: flat
//! fields, fields nested under `data`, and fields nested under
//! `subscriptions`. Instead of branching on a payload "version" that the
//! gateway never declares, each logical field is extracted by probing an
//! ordered list of dot-separated paths against the raw JSON tree and taking
//! the first present value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Candidate paths for the gateway subscription identifier.
const SUBSCRIPTION_ID_PATHS: &[&str] = &[
    "subscription_id",
    "subscription",
    "subscriptions.id",
    "id",
    "data.id",
];

/// Candidate paths for the event status.
const STATUS_PATHS: &[&str] = &["status", "data.status"];

/// Candidate paths for the payment transaction identifier.
const TRANSACTION_ID_PATHS: &[&str] = &[
    "transaction_id",
    "transaction_key",
    "data.transaction_id",
];

/// Candidate paths for the gateway client identifier.
const CLIENT_ID_PATHS: &[&str] = &["client", "subscriptions.client", "data.client"];

/// Gateway-assigned event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Payment,
    Subscription,
    Generic,
}

impl Topic {
    /// Parses a topic string. Anything unrecognized maps to `Generic`,
    /// matching the gateway's habit of omitting the parameter entirely.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("payment") => Topic::Payment,
            Some("subscription") => Topic::Subscription,
            _ => Topic::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Payment => "payment",
            Topic::Subscription => "subscription",
            Topic::Generic => "generic",
        }
    }
}

/// A received webhook notification, normalized from the raw payload.
///
/// Immutable once constructed; the processor only interprets it. `raw` keeps
/// the original payload for the per-user diagnostic snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub topic: Topic,
    /// Gateway-defined status string, as received (classification lowercases).
    pub status: Option<String>,
    pub subscription_id: Option<String>,
    pub client_id: Option<String>,
    pub transaction_id: Option<String>,
    /// Original payload, kept for audit only.
    pub raw: Value,
}

impl WebhookEvent {
    /// Builds an event from the (already signature-verified) JSON body.
    ///
    /// `topic_param` is the `topic` query parameter, when present; it takes
    /// precedence over a `topic` field in the body.
    pub fn from_payload(topic_param: Option<&str>, body: Value) -> Self {
        let topic_str = topic_param
            .map(str::to_string)
            .or_else(|| first_string(&body, &["topic"]));

        WebhookEvent {
            topic: Topic::parse(topic_str.as_deref()),
            status: first_string(&body, STATUS_PATHS),
            subscription_id: first_string(&body, SUBSCRIPTION_ID_PATHS),
            client_id: first_string(&body, CLIENT_ID_PATHS),
            transaction_id: first_string(&body, TRANSACTION_ID_PATHS),
            raw: body,
        }
    }
}

/// Walks a dot-separated path into a JSON tree.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Returns the first non-empty string (or stringified number) found at any
/// of the candidate paths, in order.
///
/// Numbers are stringified because some gateway payloads carry identifiers
/// as JSON numbers while others quote them.
pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    for path in paths {
        match lookup_path(value, path) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string())
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}
