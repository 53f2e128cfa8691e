//! Application layer - orchestration between the domain and the ports.

mod processor;
mod resolver;
mod return_flow;

pub use processor::{EventProcessor, ProcessOutcome};
pub use resolver::EntityResolver;
pub use return_flow::{ReturnFlowResolver, ReturnOutcome};
