//! Return-flow (confirmation page) settings.

use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnFlowConfig {
    /// Where returning buyers are redirected; absolute URL or site-relative
    /// path.
    #[serde(default = "default_confirmation_url")]
    pub confirmation_url: String,
    /// Comma-separated path fragments that identify thank-you pages.
    #[serde(default = "default_thank_you_patterns")]
    pub thank_you_patterns: String,
    /// Cookie whose presence marks a browser as already authenticated.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

fn default_confirmation_url() -> String {
    "/thank-you".to_string()
}

fn default_thank_you_patterns() -> String {
    "/thank-you,/gracias-pago".to_string()
}

fn default_session_cookie() -> String {
    "member_session".to_string()
}

impl Default for ReturnFlowConfig {
    fn default() -> Self {
        ReturnFlowConfig {
            confirmation_url: default_confirmation_url(),
            thank_you_patterns: default_thank_you_patterns(),
            session_cookie: default_session_cookie(),
        }
    }
}

impl ReturnFlowConfig {
    pub fn patterns(&self) -> Vec<String> {
        self.thank_you_patterns
            .split(',')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "return_flow.confirmation_url must be set".to_string(),
            ));
        }
        if self.patterns().is_empty() {
            return Err(ConfigError::Validation(
                "return_flow.thank_you_patterns must name at least one path".to_string(),
            ));
        }
        Ok(())
    }
}
