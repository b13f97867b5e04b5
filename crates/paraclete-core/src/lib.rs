//! Business logic and port trait definitions for Paraclete.
//!
//! This crate defines the "ports" (store, gateway, and renderer traits)
//! that the infrastructure layer implements. It depends only on
//! `paraclete-types` -- never on `paraclete-infra` or any database/IO
//! crate. The in-memory session store lives here as the reference
//! implementation of the conditional-write contract.

pub mod llm;
pub mod plan;
pub mod session;
