//! Observability for Paraclete: tracing subscriber setup and OTel GenAI
//! attribute constants.

pub mod genai_attrs;
pub mod tracing_setup;
