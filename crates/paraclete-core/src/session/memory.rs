//! In-memory session store.
//!
//! Reference implementation of the `SessionStore` conditional-write
//! contract, backed by a `DashMap`. The map's entry API holds the shard
//! lock for the duration of the compare-and-write, which makes the version
//! check and the insert a single indivisible step from the perspective of
//! concurrent callers. Used by tests and as a single-process backend.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use paraclete_types::error::StoreError;
use paraclete_types::transcript::Transcript;

use super::store::SessionStore;

/// DashMap-backed transcript store.
#[derive(Default)]
pub struct MemorySessionStore {
    transcripts: DashMap<String, Transcript>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently stored.
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Transcript>, StoreError> {
        Ok(self.transcripts.get(session_id).map(|t| t.clone()))
    }

    async fn conditional_put(
        &self,
        expected_version: u64,
        transcript: &Transcript,
    ) -> Result<bool, StoreError> {
        // The entry guard holds the shard lock across the version check
        // and the write, so two racing puts against the same expected
        // version cannot both pass.
        match self.transcripts.entry(transcript.session_id.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().version == expected_version {
                    occupied.insert(transcript.clone());
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                if expected_version == 0 {
                    vacant.insert(transcript.clone());
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}
