//! Return-flow resolution: landing the member on the confirmation page
//! after the gateway redirects them back.
//!
//! The gateway redirects the buyer's browser with whatever identifiers it
//! has, usually before the webhook has arrived. This flow only improves the
//! landing experience (a session for the order owner, the order code on the
//! confirmation URL). It never grants entitlements; that happens exclusively
//! on the verified webhook path.

use std::sync::Arc;

use url::Url;

use crate::domain::{LocalOrder, WebhookError};
use crate::ports::{MembershipStore, SessionManager};

/// What to do with the returning browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// Send the browser to the confirmation page, optionally after opening
    /// a session for the order owner.
    Redirect {
        location: String,
        session_established: bool,
    },
    /// No matching order (or not a thank-you request); let the caller fall
    /// through untouched.
    NotApplicable,
}

/// Resolves gateway return redirects to a confirmation-page location.
pub struct ReturnFlowResolver {
    store: Arc<dyn MembershipStore>,
    sessions: Arc<dyn SessionManager>,
    confirmation_url: String,
    thank_you_patterns: Vec<String>,
}

impl ReturnFlowResolver {
    pub fn new(
        store: Arc<dyn MembershipStore>,
        sessions: Arc<dyn SessionManager>,
        confirmation_url: String,
        thank_you_patterns: Vec<String>,
    ) -> Self {
        ReturnFlowResolver {
            store,
            sessions,
            confirmation_url,
            thank_you_patterns,
        }
    }

    /// Whether a request path is one of the configured thank-you pages.
    /// `None` (the bridge's own return endpoint) always qualifies.
    pub fn is_thank_you_path(&self, path: Option<&str>) -> bool {
        match path {
            None => true,
            Some(path) => {
                let path = path.trim().to_ascii_lowercase();
                self.thank_you_patterns
                    .iter()
                    .any(|pattern| path.contains(&pattern.to_ascii_lowercase()))
            }
        }
    }

    /// Resolves a return redirect.
    ///
    /// Looks the order up by subscription id first, then by transaction id.
    /// For an anonymous browser landing on a resolvable order, a session is
    /// opened for the order's owner; session failures degrade to a plain
    /// redirect. The confirmation URL gains `order=<code>` when the order
    /// has a public code.
    pub async fn resolve(
        &self,
        subscription_id: Option<&str>,
        transaction_id: Option<&str>,
        path: Option<&str>,
        authenticated: bool,
    ) -> Result<ReturnOutcome, WebhookError> {
        if !self.is_thank_you_path(path) {
            return Ok(ReturnOutcome::NotApplicable);
        }

        let Some(order) = self.find_order(subscription_id, transaction_id).await? else {
            tracing::info!(
                subscription_id = subscription_id.unwrap_or("<none>"),
                transaction_id = transaction_id.unwrap_or("<none>"),
                "return redirect without a matching order"
            );
            return Ok(ReturnOutcome::NotApplicable);
        };

        let mut session_established = false;
        if !authenticated {
            if let Some(user_id) = order.user_id {
                match self.sessions.establish(user_id).await {
                    Ok(()) => {
                        tracing::info!(%user_id, "session opened for returning buyer");
                        session_established = true;
                    }
                    Err(err) => {
                        tracing::warn!(%user_id, error = %err,
                            "could not open session on return, redirecting anyway");
                    }
                }
            }
        }

        Ok(ReturnOutcome::Redirect {
            location: self.confirmation_location(&order),
            session_established,
        })
    }

    async fn find_order(
        &self,
        subscription_id: Option<&str>,
        transaction_id: Option<&str>,
    ) -> Result<Option<LocalOrder>, WebhookError> {
        if let Some(sub) = subscription_id.filter(|s| !s.is_empty()) {
            if let Some(order) = self.store.find_order_by_subscription(sub).await? {
                return Ok(Some(order));
            }
        }
        if let Some(tx) = transaction_id.filter(|s| !s.is_empty()) {
            if let Some(order) = self.store.find_order_by_transaction(tx).await? {
                return Ok(Some(order));
            }
        }
        Ok(None)
    }

    fn confirmation_location(&self, order: &LocalOrder) -> String {
        let Some(code) = order.code.as_deref() else {
            return self.confirmation_url.clone();
        };
        match Url::parse(&self.confirmation_url) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("order", code);
                url.to_string()
            }
            // A relative confirmation path is allowed in config; fall back
            // to naive appending.
            Err(_) => {
                let sep = if self.confirmation_url.contains('?') { '&' } else { '?' };
                format!("{}{}order={}", self.confirmation_url, sep, code)
            }
        }
    }
}
