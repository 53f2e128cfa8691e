//! Payku gateway adapter: REST client with candidate probing, URL
//! canonicalization, and outbound request signing.

pub mod canonical;
pub mod client;
pub mod signing;

pub use canonical::canonicalize;
pub use client::PaykuClient;
