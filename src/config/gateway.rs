//! Payku gateway credentials and environment.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::GatewayEnvironment;

use super::ConfigError;

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub environment: GatewayEnvironment,
    /// `tkpu...` public token; some API versions want it in `X-Public`.
    #[serde(default = "empty_secret")]
    pub public_token: SecretString,
    /// `tkps...` secret token; bearer credential and signing key.
    #[serde(default = "empty_secret")]
    pub secret_token: SecretString,
    /// Shared secret for inbound webhook signature verification.
    #[serde(default = "empty_secret")]
    pub webhook_secret: SecretString,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            environment: GatewayEnvironment::default(),
            public_token: empty_secret(),
            secret_token: empty_secret(),
            webhook_secret: empty_secret(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "gateway.secret_token must be set".to_string(),
            ));
        }
        if self.webhook_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "gateway.webhook_secret must be set".to_string(),
            ));
        }
        Ok(())
    }
}
