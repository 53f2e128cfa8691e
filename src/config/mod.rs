//! Typed runtime configuration.
//!
//! Loaded from the environment (and a `.env` file during development) under
//! the `PAYKU_BRIDGE` prefix with `__` as the nesting separator, e.g.
//! `PAYKU_BRIDGE__GATEWAY__SECRET_TOKEN`. Every section validates itself at
//! startup so a misconfigured bridge fails before binding the listener.

mod gateway;
mod plans;
mod return_flow;
mod server;

pub use gateway::GatewayConfig;
pub use plans::PlansConfig;
pub use return_flow::ReturnFlowConfig;
pub use server::ServerConfig;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "PAYKU_BRIDGE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub plans: PlansConfig,
    #[serde(default)]
    pub return_flow: ReturnFlowConfig,
}

impl AppConfig {
    /// Loads and validates configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.gateway.validate()?;
        self.plans.validate()?;
        self.return_flow.validate()?;
        Ok(())
    }
}
