//! Adapters binding the application to the outside world.

pub mod http;
pub mod memory;
pub mod payku;
