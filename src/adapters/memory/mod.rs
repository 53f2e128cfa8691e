//! In-memory implementations of the membership ports, for tests and local
//! runs against no real membership system.

mod store;

pub use store::{InMemoryMembershipStore, InMemorySessionManager};
