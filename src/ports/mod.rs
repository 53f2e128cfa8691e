//! Ports - traits for the bridge's external collaborators.
//!
//! The membership system, the gateway REST API, and session establishment
//! are all reached through these traits; adapters provide the concrete
//! implementations.

mod gateway_api;
mod membership_store;
mod session_manager;

pub use gateway_api::{GatewayApi, GatewayError};
pub use membership_store::{MembershipStore, StoreError};
pub use session_manager::SessionManager;
