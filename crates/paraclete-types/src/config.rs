//! Application configuration types for Paraclete.
//!
//! `AppConfig` represents the top-level `config.toml`. It is loaded once at
//! startup and passed into constructors explicitly; there is no global
//! mutable configuration state.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Paraclete backend.
///
/// Loaded from `{data_dir}/config.toml`. All fields have sensible defaults,
/// so a missing file yields a working local setup. The OpenAI API key is
/// deliberately not part of this file; it comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Model identifier sent to the completion API.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum completion tokens for /ask responses.
    #[serde(default = "default_ask_max_tokens")]
    pub ask_max_tokens: u32,

    /// Maximum completion tokens for plan narratives.
    #[serde(default = "default_plan_max_tokens")]
    pub plan_max_tokens: u32,

    /// Sampling temperature for completions.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// System persona message seeded into every new session transcript.
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Path to the wkhtmltopdf binary used for plan rendering.
    #[serde(default = "default_wkhtmltopdf_bin")]
    pub wkhtmltopdf_bin: String,

    /// Retry budget for transient completion-gateway failures.
    #[serde(default = "default_gateway_max_retries")]
    pub gateway_max_retries: u32,

    /// Per-request timeout for completion calls, in seconds.
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_ask_max_tokens() -> u32 {
    150
}

fn default_plan_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f64 {
    0.7
}

fn default_persona() -> String {
    "You are Paraclete, a careful financial advisor. Answer concisely, \
     explain reasoning step by step, and remind users to consult a licensed \
     advisor for personalized decisions."
        .to_string()
}

fn default_wkhtmltopdf_bin() -> String {
    "wkhtmltopdf".to_string()
}

fn default_gateway_max_retries() -> u32 {
    2
}

fn default_gateway_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            model: default_model(),
            ask_max_tokens: default_ask_max_tokens(),
            plan_max_tokens: default_plan_max_tokens(),
            temperature: default_temperature(),
            persona: default_persona(),
            wkhtmltopdf_bin: default_wkhtmltopdf_bin(),
            gateway_max_retries: default_gateway_max_retries(),
            gateway_timeout_secs: default_gateway_timeout_secs(),
        }
    }
}
