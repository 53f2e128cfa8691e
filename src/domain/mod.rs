//! Domain layer - pure types and logic for webhook reconciliation.
//!
//! Nothing in this module performs I/O. The HTTP surface, the gateway
//! client, and the membership store live in `adapters` and are reached
//! through the traits in `ports`.

pub mod errors;
pub mod event;
pub mod order;
pub mod plans;
pub mod signature;
pub mod status;
pub mod user;

pub use errors::WebhookError;
pub use event::{Topic, WebhookEvent};
pub use order::{GatewayEnvironment, LocalOrder, OrderId, OrderStatus};
pub use plans::PlanLevelMap;
pub use signature::WebhookVerifier;
pub use status::StatusClass;
pub use user::{attrs, UserAccount, UserId};
