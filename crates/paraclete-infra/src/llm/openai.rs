//! OpenAI completion gateway implementation.
//!
//! Implements [`CompletionGateway`] against the OpenAI chat completions
//! API via [`async_openai`]. Each call carries a timeout, and transient
//! failures (rate limits, provider-side errors, transport faults) are
//! retried with jittered exponential backoff within a bounded budget.
//! Auth and invalid-request errors are never retried.
//!
//! # API Key Security
//!
//! The API key arrives wrapped in [`secrecy::SecretString`] and is only
//! exposed when constructing the client config. The gateway does NOT
//! derive Debug, so the key inside the client cannot leak through
//! Debug or tracing output.

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionResponse,
};
use async_openai::Client;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info_span, warn, Instrument};

use paraclete_core::llm::gateway::CompletionGateway;
use paraclete_observe::genai_attrs;
use paraclete_types::error::GatewayError;
use paraclete_types::llm::{Message, MessageRole};

/// Base delay for the gateway retry backoff.
const BASE_BACKOFF_MS: u64 = 250;

/// Backoff ceiling for gateway retries.
const MAX_BACKOFF_MS: u64 = 10_000;

/// OpenAI-backed completion gateway.
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f64,
    max_retries: u32,
    timeout: Duration,
}

impl OpenAiGateway {
    /// Create a gateway talking to `https://api.openai.com/v1`.
    pub fn new(
        api_key: &SecretString,
        model: impl Into<String>,
        temperature: f64,
        max_retries: u32,
        timeout: Duration,
    ) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key.expose_secret());

        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature,
            max_retries,
            timeout,
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from the conversation context.
    fn build_request(&self, messages: &[Message], max_tokens: u32) -> CreateChatCompletionRequest {
        let messages = messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    })
                }
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            })
            .collect();

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_completion_tokens: Some(max_tokens),
            temperature: Some(self.temperature as f32),
            ..Default::default()
        }
    }

    /// Single completion attempt with its own timeout.
    async fn attempt(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<Completion, GatewayError> {
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(map_openai_error)?;

        extract_reply(response)
    }
}

/// Reply text plus token accounting from a completion response.
#[derive(Debug)]
struct Completion {
    text: String,
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

/// Pull the first choice's text and the usage counts out of a response.
fn extract_reply(response: CreateChatCompletionResponse) -> Result<Completion, GatewayError> {
    let text = response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GatewayError::Provider {
            message: "completion response contained no text".to_string(),
        });
    }

    let (input_tokens, output_tokens) = match response.usage {
        Some(usage) => (Some(usage.prompt_tokens), Some(usage.completion_tokens)),
        None => (None, None),
    };

    Ok(Completion {
        text,
        input_tokens,
        output_tokens,
    })
}

// OpenAiGateway intentionally does NOT derive Debug to prevent accidental
// exposure of the API key inside the async-openai Client.

impl CompletionGateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, messages: &[Message], max_tokens: u32) -> Result<String, GatewayError> {
        let span = info_span!(
            "chat",
            { genai_attrs::GEN_AI_OPERATION_NAME } = genai_attrs::OP_CHAT,
            { genai_attrs::GEN_AI_PROVIDER_NAME } = genai_attrs::PROVIDER_OPENAI,
            { genai_attrs::GEN_AI_REQUEST_MODEL } = %self.model,
            { genai_attrs::GEN_AI_REQUEST_MAX_TOKENS } = max_tokens,
            { genai_attrs::GEN_AI_USAGE_INPUT_TOKENS } = tracing::field::Empty,
            { genai_attrs::GEN_AI_USAGE_OUTPUT_TOKENS } = tracing::field::Empty,
        );

        async {
            let mut backoff_ms = BASE_BACKOFF_MS;
            let mut last_err = None;

            for attempt in 0..=self.max_retries {
                match self.attempt(self.build_request(messages, max_tokens)).await {
                    Ok(completion) => {
                        let span = tracing::Span::current();
                        if let Some(tokens) = completion.input_tokens {
                            span.record(genai_attrs::GEN_AI_USAGE_INPUT_TOKENS, tokens);
                        }
                        if let Some(tokens) = completion.output_tokens {
                            span.record(genai_attrs::GEN_AI_USAGE_OUTPUT_TOKENS, tokens);
                        }
                        return Ok(completion.text);
                    }
                    Err(err) => {
                        if !err.is_transient() {
                            return Err(err);
                        }
                        if attempt < self.max_retries {
                            let wait = jittered(backoff_ms);
                            warn!(
                                attempt = attempt + 1,
                                retries = self.max_retries,
                                backoff_ms = wait,
                                error = %err,
                                "completion call failed, retrying"
                            );
                            tokio::time::sleep(Duration::from_millis(wait)).await;
                            backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                        }
                        last_err = Some(err);
                    }
                }
            }

            Err(last_err.unwrap_or(GatewayError::Provider {
                message: "retry budget exhausted".to_string(),
            }))
        }
        .instrument(span)
        .await
    }
}

/// Base delay plus up to half of it in random jitter.
fn jittered(base_ms: u64) -> u64 {
    base_ms + rand::rng().random_range(0..=base_ms / 2)
}

fn map_openai_error(err: async_openai::error::OpenAIError) -> GatewayError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                GatewayError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                GatewayError::RateLimited {
                    retry_after_ms: None,
                }
            } else if error_type == "invalid_request_error" {
                GatewayError::InvalidRequest(api_err.message.clone())
            } else {
                GatewayError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    401 => GatewayError::AuthenticationFailed,
                    429 => GatewayError::RateLimited {
                        retry_after_ms: None,
                    },
                    400 => GatewayError::InvalidRequest(err.to_string()),
                    _ => GatewayError::Provider {
                        message: err.to_string(),
                    },
                }
            } else {
                GatewayError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::InvalidArgument(msg) => GatewayError::InvalidRequest(msg.clone()),
        _ => GatewayError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gateway() -> OpenAiGateway {
        OpenAiGateway::new(
            &SecretString::from("sk-test"),
            "gpt-4",
            0.7,
            2,
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_gateway_name() {
        assert_eq!(test_gateway().name(), "openai");
    }

    #[test]
    fn test_build_request_maps_roles_and_limits() {
        let gateway = test_gateway();
        let messages = vec![
            Message::system("persona"),
            Message::user("q"),
            Message::assistant("a"),
            Message::user("q2"),
        ];

        let req = gateway.build_request(&messages, 150);
        assert_eq!(req.model, "gpt-4");
        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.max_completion_tokens, Some(150));
        assert!(matches!(
            req.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            req.messages[3],
            ChatCompletionRequestMessage::User(_)
        ));
    }

    fn sample_response(content: &str, with_usage: bool) -> CreateChatCompletionResponse {
        let usage = if with_usage {
            r#","usage": {"prompt_tokens": 42, "completion_tokens": 17, "total_tokens": 59}"#
        } else {
            ""
        };
        let json = format!(
            r#"{{
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gpt-4",
                "choices": [{{
                    "index": 0,
                    "message": {{"role": "assistant", "content": "{content}"}},
                    "finish_reason": "stop"
                }}]{usage}
            }}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_extract_reply_returns_text_and_usage() {
        let completion = extract_reply(sample_response("Save early.", true)).unwrap();
        assert_eq!(completion.text, "Save early.");
        assert_eq!(completion.input_tokens, Some(42));
        assert_eq!(completion.output_tokens, Some(17));
    }

    #[test]
    fn test_extract_reply_tolerates_missing_usage() {
        let completion = extract_reply(sample_response("Save early.", false)).unwrap();
        assert_eq!(completion.text, "Save early.");
        assert_eq!(completion.input_tokens, None);
        assert_eq!(completion.output_tokens, None);
    }

    #[test]
    fn test_extract_reply_rejects_empty_content() {
        let err = extract_reply(sample_response("", true)).unwrap_err();
        assert!(matches!(err, GatewayError::Provider { .. }));
    }

    #[test]
    fn test_api_auth_error_maps_to_authentication_failed() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("authentication_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, GatewayError::AuthenticationFailed));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_api_rate_limit_maps_to_rate_limited() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Rate limit exceeded".to_string(),
            r#type: Some("rate_limit_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, GatewayError::RateLimited { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_invalid_argument_maps_to_invalid_request() {
        let err = map_openai_error(async_openai::error::OpenAIError::InvalidArgument(
            "bad".to_string(),
        ));
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        for _ in 0..100 {
            let wait = jittered(250);
            assert!((250..=375).contains(&wait));
        }
    }
}
