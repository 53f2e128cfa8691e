//! Route table for the bridge.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{self, BridgeState};

pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/payku/v1/webhook", post(handlers::handle_webhook))
        .route("/payku/v1/webhook-ping", get(handlers::webhook_ping))
        .route("/payku/v1/return", get(handlers::handle_return))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
