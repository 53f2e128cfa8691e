//! Canonicalization of Payku API URLs.
//!
//! Payku's REST surface has accumulated host aliases, duplicated `/api` and
//! `/v1` prefixes, and tenant segments (`/ns12`) that newer hosts reject.
//! `canonicalize` rewrites any `*.payku.cl` URL to the single canonical host
//! and path shape for the active environment. It is applied as an explicit
//! step right before a request is sent, so callers can see exactly what goes
//! on the wire, and it is idempotent.

use url::Url;

use crate::domain::GatewayEnvironment;

/// The one host the bridge talks to per environment.
pub fn canonical_host(environment: GatewayEnvironment) -> &'static str {
    match environment {
        GatewayEnvironment::Sandbox => "testing-apirest.payku.cl",
        GatewayEnvironment::Production => "apirest.payku.cl",
    }
}

fn is_payku_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("payku.cl")
        || host.to_ascii_lowercase().ends_with(".payku.cl")
}

/// `/nsNN` tenant segments are an artifact of an old shared-hosting layout.
fn is_tenant_segment(segment: &str) -> bool {
    segment.len() > 2
        && segment.starts_with("ns")
        && segment[2..].bytes().all(|b| b.is_ascii_digit())
}

/// Normalizes a URL path into the canonical API shape: empty segments
/// collapsed, tenant segments dropped, exactly one leading `/api`,
/// consecutive `v1` repeats deduplicated.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .filter(|s| !is_tenant_segment(s))
        .collect();

    while segments.first() == Some(&"api") {
        segments.remove(0);
    }
    segments.insert(0, "api");

    let mut deduped: Vec<&str> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment == "v1" && deduped.last() == Some(&"v1") {
            continue;
        }
        deduped.push(segment);
    }

    let mut out = String::with_capacity(path.len() + 4);
    for segment in deduped {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Canonicalizes a Payku URL for the active environment. Non-Payku hosts
/// and unparseable inputs pass through unchanged.
pub fn canonicalize(raw: &str, environment: GatewayEnvironment) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(host) = url.host_str() else {
        return raw.to_string();
    };
    if !is_payku_host(host) {
        return raw.to_string();
    }

    if url.set_scheme("https").is_err() || url.set_host(Some(canonical_host(environment))).is_err()
    {
        return raw.to_string();
    }
    let path = normalize_path(url.path());
    url.set_path(&path);
    url.to_string()
}
