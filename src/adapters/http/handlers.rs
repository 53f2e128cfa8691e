//! HTTP handlers for the webhook and return-flow endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::application::{EventProcessor, ReturnFlowResolver, ReturnOutcome};
use crate::domain::{WebhookError, WebhookEvent, WebhookVerifier};

use super::dto::{ErrorResponse, ReturnQuery, WebhookAck, WebhookQuery};

pub const SIGNATURE_HEADER: &str = "x-payku-signature";

/// Shared handler state.
#[derive(Clone)]
pub struct BridgeState {
    pub verifier: Arc<WebhookVerifier>,
    pub processor: Arc<EventProcessor>,
    pub return_flow: Arc<ReturnFlowResolver>,
    /// Cookie whose presence marks the browser as already authenticated.
    pub session_cookie: String,
}

/// `POST /payku/v1/webhook`
///
/// Verification runs on the raw bytes before any JSON decoding. Once the
/// signature is valid the event is always acknowledged with 200, even when
/// local processing failed; the failure is logged for operator follow-up.
pub async fn handle_webhook(
    State(state): State<BridgeState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if !state.verifier.verify(&body, signature) {
        tracing::warn!(
            signature_present = signature.is_some(),
            "webhook rejected: signature verification failed"
        );
        return reject(WebhookError::InvalidSignature);
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "webhook rejected: body is not JSON");
            return reject(WebhookError::UnparseablePayload(err.to_string()));
        }
    };

    let event = WebhookEvent::from_payload(query.topic.as_deref(), payload);
    tracing::info!(
        topic = event.topic.as_str(),
        status = event.status.as_deref().unwrap_or("<none>"),
        subscription_id = event.subscription_id.as_deref().unwrap_or("<none>"),
        transaction_id = event.transaction_id.as_deref().unwrap_or("<none>"),
        "webhook received"
    );

    match state.processor.process(&event).await {
        Ok(outcome) => tracing::info!(?outcome, "webhook processed"),
        Err(err) => tracing::error!(error = %err, "webhook processing failed, acknowledged"),
    }
    (StatusCode::OK, Json(WebhookAck::ok())).into_response()
}

/// `GET /payku/v1/webhook-ping` - reachability probe for gateway setup.
pub async fn webhook_ping() -> Response {
    (StatusCode::OK, Json(WebhookAck::ok())).into_response()
}

/// `GET /payku/v1/return`
///
/// 302 to the confirmation URL when the identifiers resolve to an order,
/// 204 otherwise. Failures also fall through to 204; the buyer's browser is
/// never shown a bridge error.
pub async fn handle_return(
    State(state): State<BridgeState>,
    Query(query): Query<ReturnQuery>,
    headers: HeaderMap,
) -> Response {
    let authenticated = has_session_cookie(&headers, &state.session_cookie);
    let outcome = state
        .return_flow
        .resolve(
            query.subscription_id.as_deref(),
            query.id.as_deref(),
            query.path.as_deref(),
            authenticated,
        )
        .await;

    match outcome {
        Ok(ReturnOutcome::Redirect { location, .. }) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Ok(ReturnOutcome::NotApplicable) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "return flow failed, falling through");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

fn has_session_cookie(headers: &HeaderMap, cookie_name: &str) -> bool {
    let Some(cookies) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    cookies
        .split(';')
        .any(|pair| pair.trim().starts_with(&format!("{cookie_name}=")))
}

fn reject(err: WebhookError) -> Response {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    (err.status_code(), Json(body)).into_response()
}
