//! Infrastructure layer for Paraclete.
//!
//! Contains implementations of the port traits defined in `paraclete-core`:
//! the SQLite transcript store, the OpenAI completion gateway, and the
//! wkhtmltopdf plan renderer, plus the config loader.

pub mod config;
pub mod llm;
pub mod pdf;
pub mod sqlite;
