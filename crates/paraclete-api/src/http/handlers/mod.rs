//! Request handlers for the REST API.

pub mod ask;
pub mod plan;
