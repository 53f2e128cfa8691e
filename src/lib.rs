//! payku-bridge: reconciles Payku payment/subscription webhooks and return
//! redirects with a membership system's users, orders, and levels.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
