//! Webhook event processing: reconciling gateway notifications with local
//! membership state.
//!
//! Processing is idempotent. A redelivered event re-applies the same
//! transitions, which the order state machine and the store's level/cancel
//! operations accept as no-ops, and answers identically.

use std::sync::Arc;

use crate::domain::{
    attrs, GatewayEnvironment, LocalOrder, OrderId, OrderStatus, PlanLevelMap, StatusClass,
    Topic, UserAccount, UserId, WebhookError, WebhookEvent,
};
use crate::ports::{GatewayApi, MembershipStore};

use super::EntityResolver;

/// What a processed event did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Membership granted (or re-confirmed) at the given level.
    MembershipActivated {
        user_id: UserId,
        level_id: u32,
        order_id: Option<OrderId>,
    },
    /// Membership cancelled; the current order moved to cancelled when one
    /// existed.
    MembershipCancelled {
        user_id: UserId,
        order_id: Option<OrderId>,
    },
    /// A failure was recorded on an order without touching membership.
    OrderAnnotated { order_id: OrderId },
    /// Nothing applicable to local state; the event was acknowledged only.
    NoAction,
}

/// Applies webhook events to the membership store.
pub struct EventProcessor {
    resolver: EntityResolver,
    store: Arc<dyn MembershipStore>,
    plans: PlanLevelMap,
    environment: GatewayEnvironment,
}

impl EventProcessor {
    pub fn new(
        gateway: Arc<dyn GatewayApi>,
        store: Arc<dyn MembershipStore>,
        plans: PlanLevelMap,
        environment: GatewayEnvironment,
    ) -> Self {
        EventProcessor {
            resolver: EntityResolver::new(gateway, Arc::clone(&store)),
            store,
            plans,
            environment,
        }
    }

    /// Processes one verified event.
    ///
    /// Store errors bubble up for logging; the HTTP layer still acknowledges
    /// the event so the gateway does not retry a payload we cannot use.
    pub async fn process(&self, event: &WebhookEvent) -> Result<ProcessOutcome, WebhookError> {
        match StatusClass::classify(event.status.as_deref()) {
            StatusClass::Success => self.apply_success(event).await,
            StatusClass::Failure => self.apply_failure(event).await,
            StatusClass::Unrecognized => {
                tracing::info!(
                    topic = event.topic.as_str(),
                    status = event.status.as_deref().unwrap_or("<none>"),
                    "unrecognized status, acknowledging without action"
                );
                Ok(ProcessOutcome::NoAction)
            }
        }
    }

    async fn apply_success(&self, event: &WebhookEvent) -> Result<ProcessOutcome, WebhookError> {
        let user = match self.resolve_or_create_user(event).await? {
            Some(user) => user,
            None => {
                tracing::warn!(
                    subscription_id = event.subscription_id.as_deref().unwrap_or("<none>"),
                    client_id = event.client_id.as_deref().unwrap_or("<none>"),
                    "successful payment could not be attributed to any account"
                );
                return Ok(ProcessOutcome::NoAction);
            }
        };

        // Level recorded at checkout wins; otherwise resolve the plan from
        // the gateway and map it, falling back to the configured default.
        let level_id = match user.stored_level() {
            Some(level) => level,
            None => {
                let plan = match event.subscription_id.as_deref() {
                    Some(sub) => self.resolver.resolve_plan(sub).await,
                    None => None,
                };
                self.plans.level_for(plan.as_deref())
            }
        };

        let order_id = self.settle_order(event, &user, level_id).await?;

        self.store
            .change_membership_level(user.user_id, level_id)
            .await?;
        self.refresh_attributes(&user, event, Some(level_id)).await?;

        tracing::info!(
            user_id = %user.user_id,
            level_id,
            order_id = ?order_id,
            "membership activated"
        );
        Ok(ProcessOutcome::MembershipActivated {
            user_id: user.user_id,
            level_id,
            order_id,
        })
    }

    async fn apply_failure(&self, event: &WebhookEvent) -> Result<ProcessOutcome, WebhookError> {
        let user = self
            .resolver
            .resolve_local_user(
                event.subscription_id.as_deref(),
                event.client_id.as_deref(),
                event.transaction_id.as_deref(),
            )
            .await?;

        match event.topic {
            // A failed charge never revokes an existing grant; it only
            // leaves a trace on the order.
            Topic::Payment => self.annotate_order(event, user.as_ref()).await,
            Topic::Subscription | Topic::Generic => self.cancel(event, user).await,
        }
    }

    async fn annotate_order(
        &self,
        event: &WebhookEvent,
        user: Option<&UserAccount>,
    ) -> Result<ProcessOutcome, WebhookError> {
        if let Some(user) = user {
            self.refresh_attributes(user, event, None).await?;
        }

        let Some(mut order) = self.current_order(event).await? else {
            tracing::info!(
                transaction_id = event.transaction_id.as_deref().unwrap_or("<none>"),
                "payment failure with no matching order, acknowledged only"
            );
            return Ok(ProcessOutcome::NoAction);
        };

        order.annotate_failure(format!(
            "payment failed: status={} transaction={}",
            event.status.as_deref().unwrap_or("<none>"),
            event.transaction_id.as_deref().unwrap_or("<none>"),
        ));
        let stored = self.store.save_order(order).await?;
        let order_id = stored
            .order_id
            .ok_or_else(|| WebhookError::Store("saved order has no id".to_string()))?;

        tracing::info!(%order_id, "payment failure annotated on order");
        Ok(ProcessOutcome::OrderAnnotated { order_id })
    }

    async fn cancel(
        &self,
        event: &WebhookEvent,
        user: Option<UserAccount>,
    ) -> Result<ProcessOutcome, WebhookError> {
        let mut order_id = None;
        if let Some(mut order) = self.current_order(event).await? {
            if order.status.can_transition_to(OrderStatus::Cancelled) {
                order.status = OrderStatus::Cancelled;
            } else {
                order.annotate_failure(format!(
                    "subscription ended: status={}",
                    event.status.as_deref().unwrap_or("<none>"),
                ));
            }
            let stored = self.store.save_order(order).await?;
            order_id = stored.order_id;
        }

        let Some(user) = user else {
            tracing::info!(
                subscription_id = event.subscription_id.as_deref().unwrap_or("<none>"),
                "cancellation event without a resolvable account"
            );
            return Ok(match order_id {
                Some(order_id) => ProcessOutcome::OrderAnnotated { order_id },
                None => ProcessOutcome::NoAction,
            });
        };

        self.store.cancel_membership(user.user_id).await?;
        self.refresh_attributes(&user, event, None).await?;

        tracing::info!(user_id = %user.user_id, order_id = ?order_id, "membership cancelled");
        Ok(ProcessOutcome::MembershipCancelled {
            user_id: user.user_id,
            order_id,
        })
    }

    /// Finds an existing local user, or creates one from the gateway's
    /// client record when a successful payment arrives for an unknown
    /// account. Without a resolvable email no account is created.
    async fn resolve_or_create_user(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<UserAccount>, WebhookError> {
        if let Some(user) = self
            .resolver
            .resolve_local_user(
                event.subscription_id.as_deref(),
                event.client_id.as_deref(),
                event.transaction_id.as_deref(),
            )
            .await?
        {
            return Ok(Some(user));
        }

        let Some(client_id) = event.client_id.as_deref() else {
            return Ok(None);
        };
        let Some(email) = self.resolver.resolve_email(client_id).await else {
            return Ok(None);
        };

        if let Some(user) = self.store.find_user_by_email(&email).await? {
            return Ok(Some(user));
        }

        let username = email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("payku_{client_id}"));
        let user = self.store.create_user(&username, Some(&email)).await?;
        tracing::info!(user_id = %user.user_id, "created account for gateway client");
        Ok(Some(user))
    }

    /// Marks the current order successful, or backfills one when no local
    /// record exists. A cancelled order is left untouched.
    async fn settle_order(
        &self,
        event: &WebhookEvent,
        user: &UserAccount,
        level_id: u32,
    ) -> Result<Option<OrderId>, WebhookError> {
        let stored = match self.current_order(event).await? {
            Some(mut order) => {
                if !order.mark_success(event.transaction_id.as_deref()) {
                    tracing::warn!(
                        order_id = ?order.order_id,
                        status = %order.status,
                        "payment success for an order past its lifecycle, leaving it"
                    );
                    return Ok(order.order_id);
                }
                self.store.save_order(order).await?
            }
            None => {
                let order = LocalOrder::backfill(
                    user.user_id,
                    level_id,
                    event.subscription_id.clone(),
                    event.transaction_id.clone(),
                    self.environment,
                );
                tracing::info!(user_id = %user.user_id, "backfilling order for unseen payment");
                self.store.save_order(order).await?
            }
        };
        Ok(stored.order_id)
    }

    async fn current_order(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<LocalOrder>, WebhookError> {
        if let Some(sub) = event.subscription_id.as_deref() {
            if let Some(order) = self.store.find_order_by_subscription(sub).await? {
                return Ok(Some(order));
            }
        }
        if let Some(tx) = event.transaction_id.as_deref() {
            if let Some(order) = self.store.find_order_by_transaction(tx).await? {
                return Ok(Some(order));
            }
        }
        Ok(None)
    }

    /// Refreshes the user's gateway-association attributes from the event.
    /// `last_payload` is a diagnostic snapshot, overwritten every event.
    async fn refresh_attributes(
        &self,
        user: &UserAccount,
        event: &WebhookEvent,
        level_id: Option<u32>,
    ) -> Result<(), WebhookError> {
        if let Some(sub) = event.subscription_id.as_deref() {
            self.store
                .set_user_attribute(user.user_id, attrs::SUBSCRIPTION_ID, sub)
                .await?;
        }
        if let Some(client) = event.client_id.as_deref() {
            self.store
                .set_user_attribute(user.user_id, attrs::CLIENT_ID, client)
                .await?;
        }
        if let Some(level) = level_id {
            self.store
                .set_user_attribute(user.user_id, attrs::LEVEL_ID, &level.to_string())
                .await?;
        }
        if let Some(status) = event.status.as_deref() {
            self.store
                .set_user_attribute(user.user_id, attrs::LAST_STATUS, status)
                .await?;
        }
        self.store
            .set_user_attribute(user.user_id, attrs::LAST_PAYLOAD, &event.raw.to_string())
            .await?;
        Ok(())
    }
}
