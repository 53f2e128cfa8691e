//! Entity resolution: mapping gateway identifiers to emails, plans, and
//! local user records.
//!
//! Resolution is best-effort by design. The gateway's payloads are often
//! incomplete, and its REST surface disagrees with itself about resource
//! names and response shapes, so every lookup probes an ordered list of
//! resource names and field paths. `None` is a normal outcome here, never an
//! error; callers carry the documented fallback.

use std::sync::Arc;

use crate::domain::event::first_string;
use crate::domain::user::is_valid_email;
use crate::domain::{attrs, UserAccount};
use crate::ports::{GatewayApi, MembershipStore, StoreError};

/// Resource names to probe when resolving a client's email. `maclient` is a
/// legacy alias some gateway deployments still answer on.
const EMAIL_RESOURCES: &[&str] = &["customers", "clients", "maclient"];

/// Field paths an email has been observed under across gateway versions.
const EMAIL_PATHS: &[&str] = &[
    "email",
    "correo",
    "data.email",
    "data.correo",
    "customer.email",
    "client.email",
];

/// Resource names to probe when resolving a subscription's plan.
const PLAN_RESOURCES: &[&str] = &["subscriptions", "maclient"];

/// Field paths a plan identifier has been observed under.
const PLAN_PATHS: &[&str] = &["plan.id", "plan_id", "plan", "data.plan", "data.plan_id"];

/// Resolves gateway identifiers against the gateway API and the local store.
pub struct EntityResolver {
    gateway: Arc<dyn GatewayApi>,
    store: Arc<dyn MembershipStore>,
}

impl EntityResolver {
    pub fn new(gateway: Arc<dyn GatewayApi>, store: Arc<dyn MembershipStore>) -> Self {
        Self { gateway, store }
    }

    /// Resolves the email behind a gateway client id, probing candidate
    /// resources and field paths and returning the first syntactically valid
    /// address.
    pub async fn resolve_email(&self, client_id: &str) -> Option<String> {
        if client_id.is_empty() {
            return None;
        }
        for resource in EMAIL_RESOURCES {
            let body = match self.gateway.fetch_resource(resource, client_id).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(resource, client_id, error = %err,
                        "gateway lookup unavailable while resolving email");
                    continue;
                }
            };
            if let Some(candidate) = first_string(&body, EMAIL_PATHS) {
                if is_valid_email(&candidate) {
                    return Some(candidate);
                }
                tracing::debug!(resource, candidate, "discarded invalid email candidate");
            }
        }
        tracing::info!(client_id, "email could not be resolved from gateway");
        None
    }

    /// Resolves the plan id behind a gateway subscription id.
    pub async fn resolve_plan(&self, subscription_id: &str) -> Option<String> {
        if subscription_id.is_empty() {
            return None;
        }
        for resource in PLAN_RESOURCES {
            let body = match self.gateway.fetch_resource(resource, subscription_id).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(resource, subscription_id, error = %err,
                        "gateway lookup unavailable while resolving plan");
                    continue;
                }
            };
            if let Some(plan) = first_string(&body, PLAN_PATHS) {
                return Some(plan);
            }
        }
        tracing::info!(subscription_id, "plan could not be resolved from gateway");
        None
    }

    /// Resolves a local user from whatever identifiers the event carried:
    /// subscription id first, then client id, then the transaction id
    /// against order records. Most-recently-created wins on multiple
    /// matches (the store guarantees that ordering).
    pub async fn resolve_local_user(
        &self,
        subscription_id: Option<&str>,
        client_id: Option<&str>,
        transaction_id: Option<&str>,
    ) -> Result<Option<UserAccount>, StoreError> {
        if let Some(sub) = subscription_id.filter(|s| !s.is_empty()) {
            if let Some(user) = self
                .store
                .find_user_by_attribute(attrs::SUBSCRIPTION_ID, sub)
                .await?
            {
                return Ok(Some(user));
            }
        }
        if let Some(client) = client_id.filter(|s| !s.is_empty()) {
            if let Some(user) = self
                .store
                .find_user_by_attribute(attrs::CLIENT_ID, client)
                .await?
            {
                return Ok(Some(user));
            }
        }
        if let Some(tx) = transaction_id.filter(|s| !s.is_empty()) {
            if let Some(order) = self.store.find_order_by_transaction(tx).await? {
                if let Some(user_id) = order.user_id {
                    if let Some(user) = self.store.find_user_by_id(user_id).await? {
                        tracing::debug!(%user_id, "user resolved via order transaction");
                        return Ok(Some(user));
                    }
                    tracing::warn!(%user_id, transaction_id = tx,
                        "order owner no longer exists in the store");
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LocalOrder, OrderId, UserId};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    /// Gateway stub returning canned bodies per resource name.
    struct StubGateway {
        responses: HashMap<&'static str, Value>,
        calls: Mutex<Vec<String>>,
    }

    impl StubGateway {
        fn new(responses: HashMap<&'static str, Value>) -> Self {
            Self {
                responses,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self::new(HashMap::new())
        }
    }

    #[async_trait]
    impl GatewayApi for StubGateway {
        async fn fetch_resource(
            &self,
            resource: &str,
            id: &str,
        ) -> Result<Option<Value>, crate::ports::GatewayError> {
            self.calls.lock().unwrap().push(format!("{resource}/{id}"));
            Ok(self.responses.get(resource).cloned())
        }
    }

    struct StubStore {
        users: Vec<UserAccount>,
        orders: Vec<LocalOrder>,
    }

    impl StubStore {
        fn empty() -> Self {
            Self {
                users: Vec::new(),
                orders: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl MembershipStore for StubStore {
        async fn find_user_by_id(
            &self,
            user_id: UserId,
        ) -> Result<Option<UserAccount>, StoreError> {
            Ok(self.users.iter().find(|u| u.user_id == user_id).cloned())
        }

        async fn find_user_by_email(
            &self,
            email: &str,
        ) -> Result<Option<UserAccount>, StoreError> {
            Ok(self
                .users
                .iter()
                .find(|u| u.email.as_deref() == Some(email))
                .cloned())
        }

        async fn find_user_by_attribute(
            &self,
            key: &str,
            value: &str,
        ) -> Result<Option<UserAccount>, StoreError> {
            Ok(self
                .users
                .iter()
                .rev()
                .find(|u| u.attribute(key) == Some(value))
                .cloned())
        }

        async fn create_user(
            &self,
            _username: &str,
            _email: Option<&str>,
        ) -> Result<UserAccount, StoreError> {
            unreachable!("resolver tests never create users")
        }

        async fn set_user_attribute(
            &self,
            _user_id: UserId,
            _key: &str,
            _value: &str,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn change_membership_level(
            &self,
            _user_id: UserId,
            _level_id: u32,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn cancel_membership(&self, _user_id: UserId) -> Result<(), StoreError> {
            Ok(())
        }

        async fn find_order_by_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<Option<LocalOrder>, StoreError> {
            Ok(self
                .orders
                .iter()
                .rev()
                .find(|o| o.gateway_subscription_id.as_deref() == Some(subscription_id))
                .cloned())
        }

        async fn find_order_by_transaction(
            &self,
            transaction_id: &str,
        ) -> Result<Option<LocalOrder>, StoreError> {
            Ok(self
                .orders
                .iter()
                .rev()
                .find(|o| o.gateway_transaction_id.as_deref() == Some(transaction_id))
                .cloned())
        }

        async fn save_order(&self, mut order: LocalOrder) -> Result<LocalOrder, StoreError> {
            order.order_id = Some(OrderId(99));
            Ok(order)
        }
    }

    fn user(id: u64, attributes: &[(&str, &str)]) -> UserAccount {
        UserAccount {
            user_id: UserId(id),
            username: format!("user{id}"),
            email: Some(format!("user{id}@example.com")),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            created_at: chrono::Utc::now(),
        }
    }

    fn resolver(gateway: StubGateway, store: StubStore) -> EntityResolver {
        EntityResolver::new(Arc::new(gateway), Arc::new(store))
    }

    // ══════════════════════════════════════════════════════════════
    // Email Resolution Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn email_found_at_nested_data_path() {
        let mut responses = HashMap::new();
        responses.insert("customers", json!({"data": {"email": "m@example.com"}}));
        let r = resolver(StubGateway::new(responses), StubStore::empty());

        assert_eq!(
            r.resolve_email("CLI1").await.as_deref(),
            Some("m@example.com")
        );
    }

    #[tokio::test]
    async fn email_probe_falls_through_to_clients_resource() {
        let mut responses = HashMap::new();
        responses.insert("clients", json!({"email": "c@example.cl"}));
        let r = resolver(StubGateway::new(responses), StubStore::empty());

        assert_eq!(
            r.resolve_email("CLI1").await.as_deref(),
            Some("c@example.cl")
        );
    }

    #[tokio::test]
    async fn invalid_email_candidates_are_skipped() {
        let mut responses = HashMap::new();
        responses.insert("customers", json!({"email": "not-an-email"}));
        let r = resolver(StubGateway::new(responses), StubStore::empty());

        assert_eq!(r.resolve_email("CLI1").await, None);
    }

    #[tokio::test]
    async fn email_unknown_when_nothing_matches() {
        let r = resolver(StubGateway::empty(), StubStore::empty());
        assert_eq!(r.resolve_email("CLI1").await, None);
    }

    #[tokio::test]
    async fn empty_client_id_short_circuits() {
        let gateway = StubGateway::empty();
        let r = EntityResolver::new(Arc::new(gateway), Arc::new(StubStore::empty()));
        assert_eq!(r.resolve_email("").await, None);
    }

    // ══════════════════════════════════════════════════════════════
    // Plan Resolution Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn plan_found_at_nested_id() {
        let mut responses = HashMap::new();
        responses.insert("subscriptions", json!({"plan": {"id": "plbasic"}}));
        let r = resolver(StubGateway::new(responses), StubStore::empty());

        assert_eq!(r.resolve_plan("SUB1").await.as_deref(), Some("plbasic"));
    }

    #[tokio::test]
    async fn plan_found_at_flat_key() {
        let mut responses = HashMap::new();
        responses.insert("subscriptions", json!({"plan_id": "plx"}));
        let r = resolver(StubGateway::new(responses), StubStore::empty());

        assert_eq!(r.resolve_plan("SUB1").await.as_deref(), Some("plx"));
    }

    #[tokio::test]
    async fn plan_unknown_when_gateway_has_nothing() {
        let r = resolver(StubGateway::empty(), StubStore::empty());
        assert_eq!(r.resolve_plan("SUB1").await, None);
    }

    // ══════════════════════════════════════════════════════════════
    // Local User Resolution Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_attribute_match_wins() {
        let store = StubStore {
            users: vec![
                user(1, &[(attrs::CLIENT_ID, "CLI1")]),
                user(2, &[(attrs::SUBSCRIPTION_ID, "SUB1")]),
            ],
            orders: Vec::new(),
        };
        let r = resolver(StubGateway::empty(), store);

        let found = r
            .resolve_local_user(Some("SUB1"), Some("CLI1"), None)
            .await
            .unwrap()
            .expect("user");
        assert_eq!(found.user_id, UserId(2));
    }

    #[tokio::test]
    async fn client_attribute_is_the_fallback() {
        let store = StubStore {
            users: vec![user(1, &[(attrs::CLIENT_ID, "CLI1")])],
            orders: Vec::new(),
        };
        let r = resolver(StubGateway::empty(), store);

        let found = r
            .resolve_local_user(Some("SUB-MISSING"), Some("CLI1"), None)
            .await
            .unwrap()
            .expect("user");
        assert_eq!(found.user_id, UserId(1));
    }

    #[tokio::test]
    async fn most_recent_match_wins_on_ambiguity() {
        let store = StubStore {
            users: vec![
                user(1, &[(attrs::SUBSCRIPTION_ID, "SUB1")]),
                user(2, &[(attrs::SUBSCRIPTION_ID, "SUB1")]),
            ],
            orders: Vec::new(),
        };
        let r = resolver(StubGateway::empty(), store);

        let found = r
            .resolve_local_user(Some("SUB1"), None, None)
            .await
            .unwrap()
            .expect("user");
        assert_eq!(found.user_id, UserId(2));
    }

    #[tokio::test]
    async fn order_transaction_resolves_the_owner_without_attributes() {
        let store = StubStore {
            users: vec![user(3, &[])],
            orders: vec![LocalOrder {
                order_id: Some(OrderId(1)),
                code: Some("PK000001".to_string()),
                user_id: Some(UserId(3)),
                membership_level_id: 1,
                gateway_subscription_id: None,
                gateway_transaction_id: Some("TX1".to_string()),
                status: crate::domain::OrderStatus::Pending,
                environment: crate::domain::GatewayEnvironment::Sandbox,
                notes: Vec::new(),
                created_at: chrono::Utc::now(),
            }],
        };
        let r = resolver(StubGateway::empty(), store);

        let found = r
            .resolve_local_user(None, None, Some("TX1"))
            .await
            .unwrap()
            .expect("order owner");
        assert_eq!(found.user_id, UserId(3));
    }

    #[tokio::test]
    async fn no_identifiers_resolves_to_none() {
        let r = resolver(StubGateway::empty(), StubStore::empty());
        assert!(r
            .resolve_local_user(None, None, None)
            .await
            .unwrap()
            .is_none());
    }
}
