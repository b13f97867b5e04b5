use thiserror::Error;

/// Errors from the durable session store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unavailable(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("corrupt transcript record: {0}")]
    Corrupt(String),
}

/// Errors from the completion gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Whether retrying the same request can plausibly succeed.
    ///
    /// Auth and malformed-request failures are terminal; transport faults,
    /// timeouts, rate limits, and provider-side errors are not.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            GatewayError::AuthenticationFailed | GatewayError::InvalidRequest(_)
        )
    }
}

/// Errors surfaced to callers of `SessionManager::converse`.
///
/// Each kind is distinct and inspectable; a failed call never leaves a
/// partial transcript commit behind, so the caller may retry the whole
/// operation safely.
#[derive(Debug, Error)]
pub enum ConverseError {
    /// The session store could not be reached or answered with an error.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The completion gateway failed after its own retry budget.
    #[error("completion generation failed: {0}")]
    GenerationFailed(#[from] GatewayError),

    /// Optimistic-concurrency retries were exhausted without a commit.
    /// Transient: the caller may retry.
    #[error("session '{session_id}' contended for {attempts} attempts")]
    ConcurrencyExhausted { session_id: String, attempts: u32 },
}

/// Errors from the PDF renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    #[error("render failed: {0}")]
    Failed(String),
}

/// Errors from plan generation.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan narrative generation failed: {0}")]
    Generation(#[from] GatewayError),

    #[error("plan rendering failed: {0}")]
    Render(#[from] RenderError),
}
