//! Session conversation store: the transcript read-append-commit protocol.
//!
//! `store` defines the durable-store port, `memory` provides the reference
//! in-process implementation, and `manager` owns the optimistic-concurrency
//! conversation loop.

pub mod manager;
pub mod memory;
pub mod store;

pub use manager::SessionManager;
pub use memory::MemorySessionStore;
pub use store::SessionStore;
