//! Conversation session manager.
//!
//! Owns the read-append-commit protocol for session transcripts: read the
//! current transcript, build the completion context, generate the
//! assistant reply, and commit both turns with a version-checked write.
//! Concurrency safety comes entirely from the optimistic version check --
//! no lock is ever held across the store reads, the completion call, or
//! the conditional write, and different sessions never contend.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use paraclete_types::error::{ConverseError, StoreError};
use paraclete_types::transcript::Transcript;

use crate::llm::gateway::CompletionGateway;
use crate::session::store::SessionStore;

/// Default number of commit attempts before giving up on a contended session.
const DEFAULT_COMMIT_ATTEMPTS: u32 = 3;

/// Default base for the jittered exponential backoff between attempts.
const DEFAULT_BASE_BACKOFF_MS: u64 = 50;

/// Backoff ceiling; contention is per-session and resolves quickly.
const MAX_BACKOFF_MS: u64 = 1_000;

/// Orchestrates transcript persistence around completion calls.
///
/// Generic over `SessionStore` and `CompletionGateway` so the core never
/// depends on paraclete-infra. All configuration is passed in explicitly;
/// the manager holds no process-global state.
pub struct SessionManager<S: SessionStore, G: CompletionGateway> {
    store: S,
    gateway: G,
    persona: String,
    max_tokens: u32,
    commit_attempts: u32,
    base_backoff_ms: u64,
}

impl<S: SessionStore, G: CompletionGateway> SessionManager<S, G> {
    /// Create a manager with the given store, gateway, and persona text.
    ///
    /// The persona becomes the system message seeded into every new
    /// session transcript, exactly once per session.
    pub fn new(store: S, gateway: G, persona: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            store,
            gateway,
            persona: persona.into(),
            max_tokens,
            commit_attempts: DEFAULT_COMMIT_ATTEMPTS,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
        }
    }

    /// Override the optimistic-concurrency retry budget.
    pub fn with_commit_attempts(mut self, attempts: u32) -> Self {
        self.commit_attempts = attempts.max(1);
        self
    }

    /// Override the base backoff between contended attempts.
    pub fn with_base_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.base_backoff_ms = backoff_ms.max(10);
        self
    }

    /// Access the underlying store (read paths for handlers and tests).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Answer `user_text` within the session's transcript and durably
    /// record both turns.
    ///
    /// Exactly one pair-commit happens per successful call: the user turn
    /// and its assistant reply land together or not at all. On a version
    /// conflict the attempt's reply is discarded -- the conversational
    /// context has changed, so it is regenerated against the fresh
    /// transcript rather than reused.
    pub async fn converse(
        &self,
        session_id: &str,
        user_text: &str,
    ) -> Result<String, ConverseError> {
        let mut backoff_ms = self.base_backoff_ms;

        for attempt in 1..=self.commit_attempts {
            let base = self.read_or_create(session_id).await?;
            let context = base.context_with_user_turn(user_text);

            // Potentially seconds of latency; nothing is locked here.
            let assistant_text = self.gateway.generate(&context, self.max_tokens).await?;

            let candidate = base.with_exchange(user_text, &assistant_text);
            if self
                .store
                .conditional_put(base.version, &candidate)
                .await?
            {
                info!(
                    session_id,
                    version = candidate.version,
                    attempt,
                    "conversation turn committed"
                );
                return Ok(assistant_text);
            }

            warn!(
                session_id,
                stale_version = base.version,
                attempt,
                attempts = self.commit_attempts,
                "transcript version conflict, discarding reply and retrying"
            );

            if attempt < self.commit_attempts {
                let wait = jittered(backoff_ms);
                tokio::time::sleep(Duration::from_millis(wait)).await;
                backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
            }
        }

        Err(ConverseError::ConcurrencyExhausted {
            session_id: session_id.to_string(),
            attempts: self.commit_attempts,
        })
    }

    /// Read the current transcript, lazily creating the persona-initialized
    /// one at version 1 for an unseen session.
    ///
    /// Under a concurrent first-touch race exactly one caller's creation
    /// commit succeeds; losers fall back to the winner's committed
    /// transcript and continue with the normal append protocol.
    async fn read_or_create(&self, session_id: &str) -> Result<Transcript, ConverseError> {
        if let Some(existing) = self.store.get(session_id).await? {
            return Ok(existing);
        }

        let mut fresh = Transcript::new(session_id, &self.persona);
        fresh.version = 1;

        if self.store.conditional_put(0, &fresh).await? {
            debug!(session_id, "session transcript created");
            return Ok(fresh);
        }

        // Lost the creation race; the winner's transcript is committed now.
        self.store.get(session_id).await?.ok_or_else(|| {
            ConverseError::StoreUnavailable(StoreError::Corrupt(format!(
                "session '{session_id}' vanished after losing creation race"
            )))
        })
    }
}

/// Base delay plus up to half of it in random jitter, to decorrelate
/// contending retries on the same session.
fn jittered(base_ms: u64) -> u64 {
    base_ms + rand::rng().random_range(0..=base_ms / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use paraclete_types::error::GatewayError;
    use paraclete_types::llm::{Message, MessageRole};

    use crate::session::memory::MemorySessionStore;

    const PERSONA: &str = "You are Paraclete, a financial advisor.";

    /// Gateway that answers deterministically from the last user turn and
    /// records every context it was called with.
    struct ScriptedGateway {
        contexts: Mutex<Vec<Vec<Message>>>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl ScriptedGateway {
        fn new() -> Self {
            Self {
                contexts: Mutex::new(Vec::new()),
                delay: None,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new()
            }
        }

        fn contexts(&self) -> Vec<Vec<Message>> {
            self.contexts.lock().unwrap().clone()
        }
    }

    impl CompletionGateway for &ScriptedGateway {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            messages: &[Message],
            _max_tokens: u32,
        ) -> Result<String, GatewayError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.contexts.lock().unwrap().push(messages.to_vec());
            if self.fail {
                return Err(GatewayError::Provider {
                    message: "scripted failure".to_string(),
                });
            }
            let last = messages.last().expect("context never empty");
            Ok(format!("reply to: {}", last.content))
        }
    }

    /// Store that accepts creation but rejects every append commit, to
    /// exhaust the retry budget deterministically.
    struct AppendRejectingStore {
        inner: MemorySessionStore,
        rejected: AtomicU32,
    }

    impl AppendRejectingStore {
        fn new() -> Self {
            Self {
                inner: MemorySessionStore::new(),
                rejected: AtomicU32::new(0),
            }
        }
    }

    impl SessionStore for &AppendRejectingStore {
        async fn get(&self, session_id: &str) -> Result<Option<Transcript>, StoreError> {
            self.inner.get(session_id).await
        }

        async fn conditional_put(
            &self,
            expected_version: u64,
            transcript: &Transcript,
        ) -> Result<bool, StoreError> {
            if expected_version == 0 {
                return self.inner.conditional_put(0, transcript).await;
            }
            self.rejected.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }

    /// Store whose reads always fail.
    struct DownStore;

    impl SessionStore for DownStore {
        async fn get(&self, _session_id: &str) -> Result<Option<Transcript>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn conditional_put(
            &self,
            _expected_version: u64,
            _transcript: &Transcript,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Assert the transcript is the persona message followed by correctly
    /// paired (user, assistant) exchanges.
    fn assert_well_paired(transcript: &Transcript) {
        assert_eq!(transcript.messages[0].role, MessageRole::System);
        assert_eq!(transcript.messages[0].content, PERSONA);
        let turns = &transcript.messages[1..];
        assert_eq!(turns.len() % 2, 0, "unpaired turn in transcript");
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
            assert_eq!(pair[1].content, format!("reply to: {}", pair[0].content));
        }
    }

    #[tokio::test]
    async fn test_first_converse_creates_then_commits_pair() {
        let store = MemorySessionStore::new();
        let gateway = ScriptedGateway::new();
        let manager = SessionManager::new(store, &gateway, PERSONA, 150);

        let answer = manager
            .converse("s1", "What is compound interest?")
            .await
            .unwrap();
        assert_eq!(answer, "reply to: What is compound interest?");

        // Creation committed version 1, the pair commit version 2.
        let stored = manager.store().get("s1").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.messages.len(), 3);
        assert_well_paired(&stored);

        // The gateway saw exactly [persona, user turn].
        let contexts = gateway.contexts();
        assert_eq!(contexts.len(), 1);
        assert_eq!(
            contexts[0],
            vec![
                Message::system(PERSONA),
                Message::user("What is compound interest?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_converse_sees_first_exchange() {
        let store = MemorySessionStore::new();
        let gateway = ScriptedGateway::new();
        let manager = SessionManager::new(store, &gateway, PERSONA, 150);

        manager
            .converse("s1", "What is compound interest?")
            .await
            .unwrap();
        manager.converse("s1", "Give an example").await.unwrap();

        let stored = manager.store().get("s1").await.unwrap().unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.messages.len(), 5);
        assert_well_paired(&stored);

        // The second completion context includes the full first exchange.
        let contexts = gateway.contexts();
        assert_eq!(contexts[1].len(), 4);
        assert_eq!(contexts[1][1].content, "What is compound interest?");
        assert_eq!(
            contexts[1][2].content,
            "reply to: What is compound interest?"
        );
        assert_eq!(contexts[1][3], Message::user("Give an example"));
    }

    #[tokio::test]
    async fn test_versions_increase_without_gaps() {
        let store = MemorySessionStore::new();
        let gateway = ScriptedGateway::new();
        let manager = SessionManager::new(store, &gateway, PERSONA, 150);

        let mut seen = Vec::new();
        for question in ["q1", "q2", "q3", "q4"] {
            manager.converse("s1", question).await.unwrap();
            seen.push(manager.store().get("s1").await.unwrap().unwrap().version);
        }

        // v1 was the creation commit; each call adds exactly 1.
        assert_eq!(seen, vec![2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_append_only_commit_order() {
        let store = MemorySessionStore::new();
        let gateway = ScriptedGateway::new();
        let manager = SessionManager::new(store, &gateway, PERSONA, 150);

        for question in ["q1", "q2", "q3"] {
            manager.converse("s1", question).await.unwrap();
        }

        let stored = manager.store().get("s1").await.unwrap().unwrap();
        let contents: Vec<&str> = stored.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                PERSONA,
                "q1",
                "reply to: q1",
                "q2",
                "reply to: q2",
                "q3",
                "reply to: q3",
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_converse_loses_no_update() {
        let store = MemorySessionStore::new();
        let gateway = Box::leak(Box::new(ScriptedGateway::slow(Duration::from_millis(20))));
        let manager = Arc::new(SessionManager::new(store, &*gateway, PERSONA, 150));

        let (a, b) = tokio::join!(
            {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.converse("fresh", "from device A").await })
            },
            {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.converse("fresh", "from device B").await })
            },
        );

        // Both calls eventually succeed.
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let stored = manager.store().get("fresh").await.unwrap().unwrap();
        // Creation plus two pair commits, in some total order.
        assert_eq!(stored.version, 3);
        assert_eq!(stored.messages.len(), 5);
        assert_well_paired(&stored);

        let users: Vec<&str> = stored
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect();
        assert!(users.contains(&"from device A"));
        assert!(users.contains(&"from device B"));
    }

    #[tokio::test]
    async fn test_gateway_failure_commits_nothing() {
        let store = MemorySessionStore::new();
        let good = ScriptedGateway::new();
        let seed = SessionManager::new(store, &good, PERSONA, 150);
        seed.converse("s1", "q1").await.unwrap();
        let before = seed.store().get("s1").await.unwrap().unwrap();

        // Rebuild a manager over the same store with a failing gateway.
        let store = seed.store;
        let bad = ScriptedGateway::failing();
        let manager = SessionManager::new(store, &bad, PERSONA, 150);

        let err = manager.converse("s1", "q2").await.unwrap_err();
        assert!(matches!(err, ConverseError::GenerationFailed(_)));

        // Same version, same messages: the user turn was not silently lost
        // into a partial commit.
        let after = manager.store().get("s1").await.unwrap().unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.messages, before.messages);
    }

    #[tokio::test]
    async fn test_gateway_failure_on_fresh_session_leaves_persona_only() {
        let store = MemorySessionStore::new();
        let bad = ScriptedGateway::failing();
        let manager = SessionManager::new(store, &bad, PERSONA, 150);

        let err = manager.converse("fresh", "q1").await.unwrap_err();
        assert!(matches!(err, ConverseError::GenerationFailed(_)));

        // The lazily created transcript is persona-only at version 1; no
        // user turn was committed without its assistant turn.
        let stored = manager.store().get("fresh").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_first_touch_race_creates_exactly_one_transcript() {
        let store = MemorySessionStore::new();
        let gateway = Box::leak(Box::new(ScriptedGateway::new()));
        // Enough attempts for all contenders to drain through the CAS.
        let manager = Arc::new(
            SessionManager::new(store, &*gateway, PERSONA, 150)
                .with_commit_attempts(16)
                .with_base_backoff_ms(10),
        );

        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager.converse("burst", &format!("q{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = manager.store().get("burst").await.unwrap().unwrap();
        // Exactly one persona message, never N duplicates.
        let personas = stored
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .count();
        assert_eq!(personas, 1);
        assert_eq!(stored.messages[0].role, MessageRole::System);

        // One creation commit plus one pair commit per caller.
        assert_eq!(stored.version, 9);
        assert_eq!(stored.messages.len(), 17);
        assert_well_paired(&stored);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_concurrency_error() {
        let store = AppendRejectingStore::new();
        let gateway = ScriptedGateway::new();
        let manager = SessionManager::new(&store, &gateway, PERSONA, 150)
            .with_base_backoff_ms(10);

        let err = manager.converse("s1", "q1").await.unwrap_err();
        match err {
            ConverseError::ConcurrencyExhausted {
                session_id,
                attempts,
            } => {
                assert_eq!(session_id, "s1");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected ConcurrencyExhausted, got {other:?}"),
        }

        // One generation per attempt, each discarded on conflict.
        assert_eq!(store.rejected.load(Ordering::SeqCst), 3);
        assert_eq!(gateway.contexts().len(), 3);

        // Nothing beyond the creation commit landed.
        let stored = store.inner.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_store_unavailable_propagates() {
        let gateway = ScriptedGateway::new();
        let manager = SessionManager::new(DownStore, &gateway, PERSONA, 150);

        let err = manager.converse("s1", "q1").await.unwrap_err();
        assert!(matches!(err, ConverseError::StoreUnavailable(_)));
        // The gateway was never invoked for a session we could not read.
        assert!(gateway.contexts().is_empty());
    }
}
