//! HTTP/REST API layer for Paraclete.
//!
//! Axum-based API with envelope error responses and CORS support. The
//! CORS policy is deliberately permissive; the original deployment served
//! a third-party hosted frontend.

pub mod error;
pub mod handlers;
pub mod router;
