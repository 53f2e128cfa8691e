use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use payku_bridge::adapters::http::{router, BridgeState};
use payku_bridge::adapters::memory::{InMemoryMembershipStore, InMemorySessionManager};
use payku_bridge::adapters::payku::PaykuClient;
use payku_bridge::application::{EventProcessor, ReturnFlowResolver};
use payku_bridge::config::AppConfig;
use payku_bridge::domain::WebhookVerifier;
use payku_bridge::ports::{GatewayApi, MembershipStore, SessionManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payku_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_config = AppConfig::load()?;
    let environment = app_config.gateway.environment;
    tracing::info!(environment = environment.as_str(), "starting payku bridge");

    let gateway: Arc<dyn GatewayApi> = Arc::new(PaykuClient::new(
        environment,
        app_config.gateway.public_token.clone(),
        app_config.gateway.secret_token.clone(),
    )?);
    // The membership system is external; the in-memory store stands in for
    // local runs until a real adapter is wired.
    let store: Arc<dyn MembershipStore> = Arc::new(InMemoryMembershipStore::new());
    let sessions: Arc<dyn SessionManager> = Arc::new(InMemorySessionManager::new());

    let processor = Arc::new(EventProcessor::new(
        Arc::clone(&gateway),
        Arc::clone(&store),
        app_config.plans.to_plan_map()?,
        environment,
    ));
    let return_flow = Arc::new(ReturnFlowResolver::new(
        Arc::clone(&store),
        sessions,
        app_config.return_flow.confirmation_url.clone(),
        app_config.return_flow.patterns(),
    ));
    let verifier = Arc::new(WebhookVerifier::new(
        app_config.gateway.webhook_secret.clone(),
    ));

    let state = BridgeState {
        verifier,
        processor,
        return_flow,
        session_cookie: app_config.return_flow.session_cookie.clone(),
    };

    let listener = tokio::net::TcpListener::bind(app_config.server.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
