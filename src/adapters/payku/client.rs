//! Payku REST client with candidate probing.
//!
//! The gateway's REST surface differs by environment, account age, and
//! resource spelling. Rather than encoding one "correct" shape, reads walk a
//! prioritized candidate list of (base URL, path, auth scheme) combinations
//! and short-circuit on the first 2xx JSON-object response. Exhaustion is
//! `Ok(None)`: absence of information, not an error.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::domain::GatewayEnvironment;
use crate::ports::{GatewayApi, GatewayError};

use super::canonical::{canonicalize, normalize_path};
use super::signing;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);

const SANDBOX_BASES: &[&str] = &[
    "https://testing-apirest.payku.cl/api",
    "https://testing-apirest.payku.cl/api/v1",
];
const PRODUCTION_BASES: &[&str] = &[
    "https://apirest.payku.cl/api",
    "https://apirest.payku.cl/api/v1",
];
// Hosts older accounts were provisioned on; still answer for some resources.
const LEGACY_BASES: &[&str] = &["https://des.payku.cl/api", "https://app.payku.cl/api"];

/// Auth header shapes the gateway has accepted across versions.
#[derive(Debug, Clone, Copy)]
enum AuthScheme {
    Bearer,
    TokenPair,
}

const AUTH_SCHEMES: &[AuthScheme] = &[AuthScheme::Bearer, AuthScheme::TokenPair];

/// Gateway REST client. Cheap to clone; the inner `reqwest::Client` pools
/// connections.
#[derive(Clone)]
pub struct PaykuClient {
    http: reqwest::Client,
    environment: GatewayEnvironment,
    public_token: SecretString,
    secret_token: SecretString,
}

impl PaykuClient {
    pub fn new(
        environment: GatewayEnvironment,
        public_token: SecretString,
        secret_token: SecretString,
    ) -> Result<Self, GatewayError> {
        if secret_token.expose_secret().trim().is_empty() {
            return Err(GatewayError::Misconfigured(
                "gateway secret token is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .map_err(|err| GatewayError::Misconfigured(err.to_string()))?;
        Ok(PaykuClient {
            http,
            environment,
            public_token,
            secret_token,
        })
    }

    /// Sends a signed write to a caller-supplied endpoint. The URL goes
    /// through `canonicalize` right before the send, so stale Payku hosts
    /// and path shapes in stored notify/return URLs are rewritten. Non-2xx
    /// and transport failures are logged and yield `Ok(None)`.
    pub async fn post_resource(
        &self,
        url: &str,
        resource: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<Option<Value>, GatewayError> {
        let url = canonicalize(url, self.environment);
        let sign = signing::sign_request(&self.secret_token, resource, fields);

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.secret_token.expose_secret())
            .header("Sign", sign)
            .header(header::ACCEPT, "application/json")
            .json(fields)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(body) if body.is_object() => Ok(Some(body)),
                Ok(_) | Err(_) => {
                    tracing::warn!(url, resource, "gateway write answered without a JSON object");
                    Ok(None)
                }
            },
            Ok(resp) => {
                tracing::warn!(url, resource, status = resp.status().as_u16(),
                    "gateway write rejected");
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(url, resource, error = %err, "gateway write failed");
                Ok(None)
            }
        }
    }

    fn bases(&self) -> Vec<&'static str> {
        let (primary, secondary) = match self.environment {
            GatewayEnvironment::Sandbox => (SANDBOX_BASES, PRODUCTION_BASES),
            GatewayEnvironment::Production => (PRODUCTION_BASES, SANDBOX_BASES),
        };
        primary
            .iter()
            .chain(secondary.iter())
            .chain(LEGACY_BASES.iter())
            .copied()
            .collect()
    }

    async fn attempt(&self, url: &str, scheme: AuthScheme) -> Result<Value, String> {
        let request = match scheme {
            AuthScheme::Bearer => self
                .http
                .get(url)
                .bearer_auth(self.secret_token.expose_secret()),
            AuthScheme::TokenPair => self
                .http
                .get(url)
                .header("X-Public", self.public_token.expose_secret())
                .header("X-Secret", self.secret_token.expose_secret()),
        }
        .header(header::ACCEPT, "application/json");

        let response = request.send().await.map_err(|err| format!("transport: {err}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("http {}", status.as_u16()));
        }
        match response.json::<Value>().await {
            Ok(body) if body.is_object() => Ok(body),
            Ok(_) => Err("non-object body".to_string()),
            Err(err) => Err(format!("bad json: {err}")),
        }
    }
}

#[async_trait]
impl GatewayApi for PaykuClient {
    async fn fetch_resource(
        &self,
        resource: &str,
        id: &str,
    ) -> Result<Option<Value>, GatewayError> {
        let mut attempts: Vec<String> = Vec::new();
        for base in self.bases() {
            for path in candidate_paths(resource, id) {
                let url = candidate_url(base, &path);
                for &scheme in AUTH_SCHEMES {
                    match self.attempt(&url, scheme).await {
                        Ok(body) => {
                            tracing::debug!(url, ?scheme, resource, id,
                                attempts = attempts.len(), "gateway probe hit");
                            return Ok(Some(body));
                        }
                        Err(outcome) => {
                            tracing::debug!(url, ?scheme, outcome, "gateway probe miss");
                            attempts.push(format!("{scheme:?} {url}: {outcome}"));
                        }
                    }
                }
            }
        }
        tracing::info!(resource, id, attempts = attempts.len(),
            "gateway probe exhausted without a usable response");
        Ok(None)
    }
}

/// The gateway spells the same resource both `clients` and `customers`
/// depending on version.
fn alias_resource(resource: &str) -> Option<&'static str> {
    match resource {
        "clients" => Some("customers"),
        "customers" => Some("clients"),
        _ => None,
    }
}

fn candidate_paths(resource: &str, id: &str) -> Vec<String> {
    let mut paths = vec![format!("/{resource}/{id}")];
    if let Some(alias) = alias_resource(resource) {
        paths.push(format!("/{alias}/{id}"));
    }
    paths.push(format!("/v1/{resource}/{id}"));
    let legacy = format!("/maclient/{id}");
    if !paths.contains(&legacy) {
        paths.push(legacy);
    }
    paths
}

/// Joins a base and candidate path, then normalizes the combined path so
/// base/path overlap (`/api/v1` + `/v1/...`) never doubles a segment.
fn candidate_url(base: &str, path: &str) -> String {
    let full = format!("{base}{path}");
    match Url::parse(&full) {
        Ok(mut url) => {
            let normalized = normalize_path(url.path());
            url.set_path(&normalized);
            url.to_string()
        }
        Err(_) => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(environment: GatewayEnvironment) -> PaykuClient {
        PaykuClient::new(
            environment,
            SecretString::new("tkpu_public".to_string()),
            SecretString::new("tkpu_secret".to_string()),
        )
        .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Candidate Construction Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn sandbox_probes_sandbox_hosts_first() {
        let bases = client(GatewayEnvironment::Sandbox).bases();
        assert_eq!(bases[0], "https://testing-apirest.payku.cl/api");
        assert_eq!(bases[1], "https://testing-apirest.payku.cl/api/v1");
        assert!(bases.contains(&"https://des.payku.cl/api"));
        assert!(bases.contains(&"https://app.payku.cl/api"));
    }

    #[test]
    fn production_probes_production_hosts_first() {
        let bases = client(GatewayEnvironment::Production).bases();
        assert_eq!(bases[0], "https://apirest.payku.cl/api");
        assert_eq!(bases[1], "https://apirest.payku.cl/api/v1");
    }

    #[test]
    fn clients_probe_includes_customers_alias() {
        let paths = candidate_paths("clients", "CLI1");
        assert_eq!(
            paths,
            vec![
                "/clients/CLI1",
                "/customers/CLI1",
                "/v1/clients/CLI1",
                "/maclient/CLI1",
            ]
        );
    }

    #[test]
    fn unaliased_resource_has_no_swap() {
        let paths = candidate_paths("subscriptions", "SUB1");
        assert_eq!(
            paths,
            vec![
                "/subscriptions/SUB1",
                "/v1/subscriptions/SUB1",
                "/maclient/SUB1",
            ]
        );
    }

    #[test]
    fn maclient_resource_is_not_probed_twice() {
        let paths = candidate_paths("maclient", "CLI1");
        assert_eq!(paths, vec!["/maclient/CLI1", "/v1/maclient/CLI1"]);
    }

    #[test]
    fn candidate_url_normalizes_base_path_overlap() {
        assert_eq!(
            candidate_url("https://apirest.payku.cl/api/v1", "/v1/subscriptions/SUB1"),
            "https://apirest.payku.cl/api/v1/subscriptions/SUB1"
        );
        assert_eq!(
            candidate_url("https://apirest.payku.cl/api", "/clients/CLI1"),
            "https://apirest.payku.cl/api/clients/CLI1"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Signed Write Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn post_resource_sends_sign_and_bearer_headers() {
        use axum::extract::State;
        use axum::routing::post;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Seen {
            sign: Arc<Mutex<Option<String>>>,
            auth: Arc<Mutex<Option<String>>>,
        }

        async fn capture(
            State(seen): State<Seen>,
            headers: axum::http::HeaderMap,
        ) -> axum::Json<Value> {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            *seen.sign.lock().unwrap() = header("sign");
            *seen.auth.lock().unwrap() = header("authorization");
            axum::Json(serde_json::json!({"status": "registered"}))
        }

        let seen = Seen::default();
        let app = axum::Router::new()
            .route("/api/transaction/", post(capture))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut fields = BTreeMap::new();
        fields.insert("amount".to_string(), "1000".to_string());
        fields.insert("order".to_string(), "77".to_string());

        let body = client(GatewayEnvironment::Sandbox)
            .post_resource(
                &format!("http://{addr}/api/transaction/"),
                "transaction",
                &fields,
            )
            .await
            .unwrap()
            .expect("json body");
        assert_eq!(body["status"], "registered");

        let expected = signing::sign_request(
            &SecretString::new("tkpu_secret".to_string()),
            "transaction",
            &fields,
        );
        assert_eq!(seen.sign.lock().unwrap().as_deref(), Some(expected.as_str()));
        assert_eq!(
            seen.auth.lock().unwrap().as_deref(),
            Some("Bearer tkpu_secret")
        );
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let result = PaykuClient::new(
            GatewayEnvironment::Sandbox,
            SecretString::new("tkpu_public".to_string()),
            SecretString::new("  ".to_string()),
        );
        assert!(result.is_err());
    }
}
