//! Port for the external membership system's user/order store.
//!
//! The membership system owns plan levels, billing cycles, and order
//! persistence. The bridge only needs the narrow operations below; their
//! semantics (most-recent-wins on ambiguity, last-write-wins on conflicting
//! field writes) are part of this contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{LocalOrder, OrderId, UserAccount, UserId};

/// Errors from the membership store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("store rejected write: {0}")]
    WriteRejected(String),
}

impl From<StoreError> for crate::domain::WebhookError {
    fn from(err: StoreError) -> Self {
        crate::domain::WebhookError::Store(err.to_string())
    }
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Finds a user by id.
    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<UserAccount>, StoreError>;

    /// Finds a user by exact email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Finds the most recently created user carrying the given attribute
    /// key/value pair.
    async fn find_user_by_attribute(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<UserAccount>, StoreError>;

    /// Creates a user. The store de-duplicates usernames as it sees fit.
    async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, StoreError>;

    /// Writes (or overwrites) a single user attribute.
    async fn set_user_attribute(
        &self,
        user_id: UserId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Assigns the membership level. Idempotent: re-assigning the current
    /// level is a successful no-op.
    async fn change_membership_level(
        &self,
        user_id: UserId,
        level_id: u32,
    ) -> Result<(), StoreError>;

    /// Cancels the user's membership. Cancelling an already-cancelled (or
    /// absent) membership is a successful no-op.
    async fn cancel_membership(&self, user_id: UserId) -> Result<(), StoreError>;

    /// Most recently created order carrying this gateway subscription id.
    async fn find_order_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<LocalOrder>, StoreError>;

    /// Most recently created order carrying this payment transaction id.
    async fn find_order_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LocalOrder>, StoreError>;

    /// Persists an order, assigning `order_id` and a public `code` on first
    /// save. Returns the stored record.
    async fn save_order(&self, order: LocalOrder) -> Result<LocalOrder, StoreError>;
}
