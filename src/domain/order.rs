//! Local membership order record and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a local order, assigned by the membership store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gateway environment an order was created against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl GatewayEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => "sandbox",
            GatewayEnvironment::Production => "production",
        }
    }
}

/// Lifecycle status of a local order.
///
/// Allowed transitions: `Pending -> Success`, `Pending -> Error`,
/// `Success -> Cancelled`. `Cancelled` is terminal. Re-applying the current
/// status is permitted so redelivered webhooks stay idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Success,
    Error,
    Cancelled,
}

impl OrderStatus {
    /// Whether a transition to `next` is allowed from this status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (a, b) if *a == b => true, // idempotent re-apply
            (Pending, Success) | (Pending, Error) | (Success, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Error => "error",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// One membership purchase/subscription lifecycle, as stored locally.
///
/// `order_id` is `None` until the store persists the record. At most one
/// order is "current" per `gateway_subscription_id`; on ambiguity the store
/// returns the most recently created one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalOrder {
    pub order_id: Option<OrderId>,
    /// Public order code, shown to the member on the confirmation page.
    pub code: Option<String>,
    pub user_id: Option<super::UserId>,
    pub membership_level_id: u32,
    pub gateway_subscription_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub status: OrderStatus,
    pub environment: GatewayEnvironment,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl LocalOrder {
    /// A fresh order at checkout-initiation time.
    pub fn pending(
        user_id: super::UserId,
        level_id: u32,
        subscription_id: Option<String>,
        environment: GatewayEnvironment,
    ) -> Self {
        LocalOrder {
            order_id: None,
            code: None,
            user_id: Some(user_id),
            membership_level_id: level_id,
            gateway_subscription_id: subscription_id,
            gateway_transaction_id: None,
            status: OrderStatus::Pending,
            environment,
            notes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// A backfill order created directly in `Success` when a payment webhook
    /// arrives for a subscription with no local record. A synthetic
    /// transaction id is generated if the payload carried none, so the order
    /// always has a traceable reference.
    pub fn backfill(
        user_id: super::UserId,
        level_id: u32,
        subscription_id: Option<String>,
        transaction_id: Option<String>,
        environment: GatewayEnvironment,
    ) -> Self {
        let tx = transaction_id
            .unwrap_or_else(|| format!("payku-{}", uuid::Uuid::new_v4().simple()));
        LocalOrder {
            order_id: None,
            code: None,
            user_id: Some(user_id),
            membership_level_id: level_id,
            gateway_subscription_id: subscription_id,
            gateway_transaction_id: Some(tx),
            status: OrderStatus::Success,
            environment,
            notes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Marks the order successful, recording the transaction id when given.
    /// Re-applying on an already-successful order is a no-op update.
    pub fn mark_success(&mut self, transaction_id: Option<&str>) -> bool {
        if !self.status.can_transition_to(OrderStatus::Success) {
            return false;
        }
        if let Some(tx) = transaction_id {
            self.gateway_transaction_id = Some(tx.to_string());
        }
        self.status = OrderStatus::Success;
        true
    }

    /// Records a failure annotation. The status is only moved to `Error`
    /// from `Pending`; an already-successful order keeps its status and just
    /// gains the note (a later payment failure does not undo the grant).
    pub fn annotate_failure(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Error;
        }
    }
}
