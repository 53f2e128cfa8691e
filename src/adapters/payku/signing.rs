//! Outbound request signing for Payku write calls.
//!
//! The gateway expects a `Sign` header: the request body rendered as a
//! key-sorted percent-encoded query string (spaces as `+`), concatenated to
//! the percent-encoded canonical resource path, HMAC-SHA256 signed with the
//! secret token and hex encoded.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const ESCAPED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, ESCAPED)
        .to_string()
        .replace("%20", "+")
}

/// Renders body fields as the gateway's canonical query string. `BTreeMap`
/// gives the required key ordering.
pub fn canonical_query(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Computes the `Sign` header value for a write against `resource`.
pub fn sign_request(
    secret: &SecretString,
    resource: &str,
    fields: &BTreeMap<String, String>,
) -> String {
    let path = format!("/api/{}/", resource.trim_matches('/'));
    let message = format!("{}&{}", encode(&path), canonical_query(fields));
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
