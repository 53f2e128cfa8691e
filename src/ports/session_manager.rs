//! Port for establishing an authenticated session during the return flow.

use async_trait::async_trait;

use crate::domain::UserId;
use super::StoreError;

/// Establishes a session for a resolved order owner.
///
/// This is a UX shortcut on the return redirect, not proof of payment: the
/// entitlement grant happens only on the verified webhook path.
#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn establish(&self, user_id: UserId) -> Result<(), StoreError>;
}
