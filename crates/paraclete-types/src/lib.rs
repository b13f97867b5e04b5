//! Shared domain types for Paraclete.
//!
//! This crate contains the core domain types used across the Paraclete
//! backend: conversation messages, session transcripts, plan requests,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod plan;
pub mod transcript;
