//! Local user account, as seen by the bridge.
//!
//! Accounts are owned by the membership system; the bridge only resolves or
//! creates them by email and reads/writes the gateway-association attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Attribute keys used to associate a local account with gateway identifiers.
pub mod attrs {
    pub const CLIENT_ID: &str = "payku_client_id";
    pub const SUBSCRIPTION_ID: &str = "payku_subscription_id";
    pub const LEVEL_ID: &str = "payku_level_id";
    /// Last gateway status seen for this user; diagnostic only.
    pub const LAST_STATUS: &str = "payku_last_status";
    /// Last raw payload seen for this user, overwritten each event.
    pub const LAST_PAYLOAD: &str = "payku_last_payload";
}

/// Identifier of a local user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local identity with its gateway-association attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub attributes: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Reads a gateway-association attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// The membership level stored at checkout time, when present and
    /// positive.
    pub fn stored_level(&self) -> Option<u32> {
        self.attribute(attrs::LEVEL_ID)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&lvl| lvl > 0)
    }
}

/// Minimal syntactic email check used when probing gateway payloads for an
/// address: one `@`, non-empty local part, and a dotted domain. The
/// membership store remains the authority on acceptability.
pub fn is_valid_email(candidate: &str) -> bool {
    let candidate = candidate.trim();
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || candidate.contains(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty()
}
