//! Webhook signature verification.
//!
//! Payku signs webhook deliveries with HMAC-SHA256 over the exact raw body
//! bytes, hex-encoded in the `X-Payku-Signature` header. Verification must
//! run on the raw bytes before any JSON decoding, since re-serialization
//! does not preserve byte-for-byte equality.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verifier for inbound webhook signatures.
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Returns true only when the header carries a valid hex HMAC-SHA256 of
    /// `raw_body` under the shared secret. Never errors: an unconfigured
    /// secret, a missing header, or malformed hex all verify as false.
    pub fn verify(&self, raw_body: &[u8], signature_header: Option<&str>) -> bool {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            return false;
        }
        let Some(header) = signature_header else {
            return false;
        };
        let Ok(provided) = hex::decode(header.trim()) else {
            return false;
        };

        let expected = compute_hmac(secret, raw_body);
        constant_time_compare(&expected, &provided)
    }
}

/// Computes the hex signature for a body; the counterpart of `verify`,
/// used by outbound tooling and test fixtures.
pub fn sign_body(secret: &str, raw_body: &[u8]) -> String {
    hex::encode(compute_hmac(secret, raw_body))
}

fn compute_hmac(secret: &str, payload: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time comparison; prevents timing leaks of the expected value.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_payku_shared_secret";

    fn verifier(secret: &str) -> WebhookVerifier {
        WebhookVerifier::new(SecretString::new(secret.to_string()))
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"topic":"payment","status":"success"}"#;
        let sig = sign_body(SECRET, body);
        assert!(verifier(SECRET).verify(body, Some(&sig)));
    }

    #[test]
    fn arbitrary_string_fails() {
        let body = br#"{"topic":"payment"}"#;
        assert!(!verifier(SECRET).verify(body, Some("deadbeef")));
        assert!(!verifier(SECRET).verify(body, Some("not-even-hex")));
    }

    #[test]
    fn wrong_secret_fails() {
        let body = br#"{"topic":"payment"}"#;
        let sig = sign_body(SECRET, body);
        assert!(!verifier("other_secret").verify(body, Some(&sig)));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign_body(SECRET, br#"{"status":"success"}"#);
        assert!(!verifier(SECRET).verify(br#"{"status":"failed"}"#, Some(&sig)));
    }

    #[test]
    fn missing_header_fails() {
        assert!(!verifier(SECRET).verify(b"{}", None));
    }

    #[test]
    fn unconfigured_secret_fails_even_with_matching_signature() {
        let body = b"{}";
        let sig = sign_body("", body);
        assert!(!verifier("").verify(body, Some(&sig)));
    }

    #[test]
    fn header_whitespace_is_tolerated() {
        let body = b"payload";
        let sig = format!("  {}  ", sign_body(SECRET, body));
        assert!(verifier(SECRET).verify(body, Some(&sig)));
    }
}
