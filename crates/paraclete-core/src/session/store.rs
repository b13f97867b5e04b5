//! SessionStore trait definition.
//!
//! The port to whatever database backs transcript persistence. Any store
//! offering atomic conditional-write semantics suffices; implementations
//! live in paraclete-infra (`SqliteTranscriptStore`) and in this crate
//! (`MemorySessionStore`, the reference implementation).

use paraclete_types::error::StoreError;
use paraclete_types::transcript::Transcript;

/// Keyed transcript persistence with a version-checked write.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionStore: Send + Sync {
    /// Fetch the committed transcript for a session, if any.
    fn get(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Transcript>, StoreError>> + Send;

    /// Compare-and-write: store `transcript` only if the currently
    /// committed version for its session still equals `expected_version`.
    ///
    /// Must be atomic: no two concurrent calls for the same session may
    /// both succeed against the same `expected_version`. An
    /// `expected_version` of 0 is a creation attempt -- it succeeds only
    /// if no transcript exists yet, and exactly one of any number of
    /// concurrent creators wins.
    ///
    /// Returns `Ok(false)` when the version check loses the race; the
    /// caller re-reads and retries. Errors are reserved for the store
    /// itself being unavailable or corrupt.
    fn conditional_put(
        &self,
        expected_version: u64,
        transcript: &Transcript,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;
}
