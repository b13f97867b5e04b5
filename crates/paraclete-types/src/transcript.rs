//! Session transcript: the versioned, append-only message history for one
//! conversation session.
//!
//! A transcript is never mutated in place. Each commit attempt constructs a
//! new candidate value (prior messages plus the new turns) and writes it
//! wholesale with a bumped version, so concurrent readers never observe a
//! partially updated record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::{Message, MessageRole};

/// Ordered, versioned message history for one session.
///
/// `version` increases by exactly 1 per successful commit and is the basis
/// for optimistic-concurrency detection: a write that does not observe the
/// expected prior version must not apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Opaque, caller-supplied session key.
    pub session_id: String,
    /// Monotonic commit counter. 0 means "never committed".
    pub version: u64,
    /// Insertion-ordered turns; append-only once committed.
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    /// Build the initial, not-yet-committed transcript for a fresh session.
    ///
    /// Contains only the system persona message at version 0. The creation
    /// commit stores it at version 1.
    pub fn new(session_id: impl Into<String>, persona: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            version: 0,
            messages: vec![Message::system(persona)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Produce the candidate transcript for the next commit: prior messages
    /// plus a (user, assistant) turn pair, at `version + 1`.
    pub fn with_exchange(&self, user_text: &str, assistant_text: &str) -> Self {
        let mut messages = self.messages.clone();
        messages.push(Message::user(user_text));
        messages.push(Message::assistant(assistant_text));
        Self {
            session_id: self.session_id.clone(),
            version: self.version + 1,
            messages,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    /// Messages plus a trailing user turn, for use as completion context.
    ///
    /// Does not modify the transcript; the user turn is only committed
    /// together with the assistant reply.
    pub fn context_with_user_turn(&self, user_text: &str) -> Vec<Message> {
        let mut context = self.messages.clone();
        context.push(Message::user(user_text));
        context
    }

    /// Number of (user, assistant) exchanges committed so far.
    pub fn exchange_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }
}
