//! In-memory membership store and session manager.
//!
//! Behaves like the real store contract: most-recently-created wins on
//! ambiguous lookups, level changes and cancellations are idempotent, and
//! `save_order` assigns ids and public codes on first save. State lives
//! behind a `Mutex`; lock scope stays within each call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{LocalOrder, OrderId, UserAccount, UserId};
use crate::ports::{MembershipStore, SessionManager, StoreError};

#[derive(Default)]
struct Inner {
    users: Vec<UserAccount>,
    orders: Vec<LocalOrder>,
    memberships: HashMap<UserId, u32>,
    next_user_id: u64,
    next_order_id: u64,
}

/// Membership store backed by process memory.
pub struct InMemoryMembershipStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryMembershipStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        InMemoryMembershipStore {
            inner: Mutex::new(Inner {
                next_user_id: 1,
                next_order_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Seeds a user directly; test and local-run setup helper.
    pub fn seed_user(
        &self,
        username: &str,
        email: Option<&str>,
        attributes: &[(&str, &str)],
    ) -> UserId {
        let mut inner = self.lock();
        let user_id = UserId(inner.next_user_id);
        inner.next_user_id += 1;
        inner.users.push(UserAccount {
            user_id,
            username: username.to_string(),
            email: email.map(str::to_string),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            created_at: Utc::now(),
        });
        user_id
    }

    /// Seeds an order directly, assigning id and code.
    pub fn seed_order(&self, mut order: LocalOrder) -> OrderId {
        let mut inner = self.lock();
        let order_id = OrderId(inner.next_order_id);
        inner.next_order_id += 1;
        order.order_id = Some(order_id);
        order.code = Some(public_code(order_id));
        inner.orders.push(order);
        order_id
    }

    /// Current active level, if any.
    pub fn membership_level(&self, user_id: UserId) -> Option<u32> {
        self.lock().memberships.get(&user_id).copied()
    }

    /// Snapshot of all orders.
    pub fn orders(&self) -> Vec<LocalOrder> {
        self.lock().orders.clone()
    }

    /// Reads one attribute of one user.
    pub fn attribute(&self, user_id: UserId, key: &str) -> Option<String> {
        self.lock()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .and_then(|u| u.attributes.get(key).cloned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn public_code(order_id: OrderId) -> String {
    format!("PK{:06}", order_id.0)
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .lock()
            .users
            .iter()
            .rev()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_user_by_attribute(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .lock()
            .users
            .iter()
            .rev()
            .find(|u| u.attribute(key) == Some(value))
            .cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, StoreError> {
        let mut inner = self.lock();
        let user_id = UserId(inner.next_user_id);
        inner.next_user_id += 1;

        let mut username = username.to_string();
        if inner.users.iter().any(|u| u.username == username) {
            username = format!("{username}{}", user_id.0);
        }
        let user = UserAccount {
            user_id,
            username,
            email: email.map(str::to_string),
            attributes: HashMap::new(),
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn set_user_attribute(
        &self,
        user_id: UserId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or(StoreError::UserNotFound(user_id))?;
        user.attributes.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn change_membership_level(
        &self,
        user_id: UserId,
        level_id: u32,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.users.iter().any(|u| u.user_id == user_id) {
            return Err(StoreError::UserNotFound(user_id));
        }
        inner.memberships.insert(user_id, level_id);
        Ok(())
    }

    async fn cancel_membership(&self, user_id: UserId) -> Result<(), StoreError> {
        // Absent membership cancels as a no-op.
        self.lock().memberships.remove(&user_id);
        Ok(())
    }

    async fn find_order_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<LocalOrder>, StoreError> {
        Ok(self
            .lock()
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
            .lock()
            .orders
            .iter()
            .rev()
            .find(|o| o.gateway_transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn save_order(&self, mut order: LocalOrder) -> Result<LocalOrder, StoreError> {
        let mut inner = self.lock();
        match order.order_id {
            Some(order_id) => {
                let slot = inner
                    .orders
                    .iter_mut()
                    .find(|o| o.order_id == Some(order_id))
                    .ok_or(StoreError::OrderNotFound(order_id))?;
                *slot = order.clone();
            }
            None => {
                let order_id = OrderId(inner.next_order_id);
                inner.next_order_id += 1;
                order.order_id = Some(order_id);
                if order.code.is_none() {
                    order.code = Some(public_code(order_id));
                }
                inner.orders.push(order.clone());
            }
        }
        Ok(order)
    }
}

/// Session manager that records which users got a session.
#[derive(Default)]
pub struct InMemorySessionManager {
    established: Mutex<Vec<UserId>>,
}

impl InMemorySessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn established(&self) -> Vec<UserId> {
        match self.established.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SessionManager for InMemorySessionManager {
    async fn establish(&self, user_id: UserId) -> Result<(), StoreError> {
        match self.established.lock() {
            Ok(mut guard) => guard.push(user_id),
            Err(poisoned) => poisoned.into_inner().push(user_id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GatewayEnvironment, OrderStatus};

    // ══════════════════════════════════════════════════════════════
    // Store Contract Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn most_recent_attribute_match_wins() {
        let store = InMemoryMembershipStore::new();
        store.seed_user("old", None, &[("payku_subscription_id", "SUB1")]);
        let newer = store.seed_user("new", None, &[("payku_subscription_id", "SUB1")]);

        let found = store
            .find_user_by_attribute("payku_subscription_id", "SUB1")
            .await
            .unwrap()
            .expect("user");
        assert_eq!(found.user_id, newer);
    }

    #[tokio::test]
    async fn find_user_by_id_returns_the_seeded_user() {
        let store = InMemoryMembershipStore::new();
        let user_id = store.seed_user("ana", None, &[]);

        let found = store.find_user_by_id(user_id).await.unwrap().expect("user");
        assert_eq!(found.user_id, user_id);
        assert!(store.find_user_by_id(UserId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_user_deduplicates_usernames() {
        let store = InMemoryMembershipStore::new();
        let a = store.create_user("ana", Some("a@example.com")).await.unwrap();
        let b = store.create_user("ana", Some("b@example.com")).await.unwrap();
        assert_eq!(a.username, "ana");
        assert_ne!(b.username, "ana");
    }

    #[tokio::test]
    async fn save_assigns_id_and_code_once() {
        let store = InMemoryMembershipStore::new();
        let user_id = store.seed_user("ana", None, &[]);
        let order = LocalOrder::pending(user_id, 1, Some("SUB1".into()), GatewayEnvironment::Sandbox);

        let stored = store.save_order(order).await.unwrap();
        let order_id = stored.order_id.expect("id");
        let code = stored.code.clone().expect("code");

        let mut updated = stored;
        updated.status = OrderStatus::Success;
        let resaved = store.save_order(updated).await.unwrap();
        assert_eq!(resaved.order_id, Some(order_id));
        assert_eq!(resaved.code.as_deref(), Some(code.as_str()));
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test]
    async fn level_change_and_cancel_are_idempotent() {
        let store = InMemoryMembershipStore::new();
        let user_id = store.seed_user("ana", None, &[]);

        store.change_membership_level(user_id, 2).await.unwrap();
        store.change_membership_level(user_id, 2).await.unwrap();
        assert_eq!(store.membership_level(user_id), Some(2));

        store.cancel_membership(user_id).await.unwrap();
        store.cancel_membership(user_id).await.unwrap();
        assert_eq!(store.membership_level(user_id), None);
    }

    #[tokio::test]
    async fn attribute_write_requires_existing_user() {
        let store = InMemoryMembershipStore::new();
        let result = store.set_user_attribute(UserId(42), "k", "v").await;
        assert!(matches!(result, Err(StoreError::UserNotFound(UserId(42)))));
    }

    #[tokio::test]
    async fn session_manager_records_establishments() {
        let sessions = InMemorySessionManager::new();
        sessions.establish(UserId(7)).await.unwrap();
        assert_eq!(sessions.established(), vec![UserId(7)]);
    }
}
