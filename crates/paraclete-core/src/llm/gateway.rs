//! CompletionGateway trait definition.
//!
//! The boundary to the external text-generation dependency. Calls may take
//! seconds and may fail transiently; implementations carry their own
//! timeout and bounded retry budget. Callers treat any returned error as
//! terminal for the current attempt.

use paraclete_types::error::GatewayError;
use paraclete_types::llm::Message;

/// Trait for completion backends (OpenAI et al.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in paraclete-infra (e.g., `OpenAiGateway`).
pub trait CompletionGateway: Send + Sync {
    /// Human-readable gateway name (e.g., "openai").
    fn name(&self) -> &str;

    /// Generate an assistant reply for the given ordered message context.
    ///
    /// The context is the full conversation so far, ending with the user
    /// turn being answered. Returns the reply text only; the caller owns
    /// persistence.
    fn generate(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> impl std::future::Future<Output = Result<String, GatewayError>> + Send;
}
