//! Completion gateway port.

pub mod gateway;

pub use gateway::CompletionGateway;
