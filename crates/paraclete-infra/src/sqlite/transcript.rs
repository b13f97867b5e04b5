//! SQLite transcript store implementation.
//!
//! Implements `SessionStore` from `paraclete-core` using sqlx with split
//! read/write pools. One row per session; messages are stored as JSON text
//! and the whole row is replaced on every commit.
//!
//! The conditional write is expressed in the SQL itself so the
//! compare-and-write is a single indivisible statement:
//! - creation: `INSERT ... ON CONFLICT DO NOTHING`, success iff a row was
//!   inserted;
//! - append: `UPDATE ... WHERE session_id = ? AND version = ?`, success
//!   iff a row matched the expected version.
//!
//! A plain check-then-write here would reintroduce the lost-update bug
//! this store exists to prevent.

use chrono::{DateTime, Utc};
use sqlx::Row;

use paraclete_core::session::store::SessionStore;
use paraclete_types::error::StoreError;
use paraclete_types::llm::Message;
use paraclete_types::transcript::Transcript;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteTranscriptStore {
    pool: DatabasePool,
}

impl SqliteTranscriptStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct TranscriptRow {
    session_id: String,
    version: i64,
    messages: String,
    created_at: String,
    updated_at: String,
}

impl TranscriptRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            version: row.try_get("version")?,
            messages: row.try_get("messages")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_transcript(self) -> Result<Transcript, StoreError> {
        let messages: Vec<Message> = serde_json::from_str(&self.messages)
            .map_err(|e| StoreError::Corrupt(format!("invalid messages JSON: {e}")))?;
        let version = u64::try_from(self.version)
            .map_err(|_| StoreError::Corrupt(format!("negative version: {}", self.version)))?;

        Ok(Transcript {
            session_id: self.session_id,
            version,
            messages,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn query_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// SessionStore implementation
// ---------------------------------------------------------------------------

impl SessionStore for SqliteTranscriptStore {
    async fn get(&self, session_id: &str) -> Result<Option<Transcript>, StoreError> {
        let row = sqlx::query("SELECT * FROM transcripts WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let transcript_row = TranscriptRow::from_row(&row).map_err(query_error)?;
                Ok(Some(transcript_row.into_transcript()?))
            }
            None => Ok(None),
        }
    }

    async fn conditional_put(
        &self,
        expected_version: u64,
        transcript: &Transcript,
    ) -> Result<bool, StoreError> {
        let messages = serde_json::to_string(&transcript.messages)
            .map_err(|e| StoreError::Query(format!("failed to serialize messages: {e}")))?;
        let version = i64::try_from(transcript.version)
            .map_err(|_| StoreError::Query(format!("version overflow: {}", transcript.version)))?;

        let result = if expected_version == 0 {
            // Creation: exactly one concurrent creator inserts the row.
            sqlx::query(
                r#"INSERT INTO transcripts (session_id, version, messages, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT (session_id) DO NOTHING"#,
            )
            .bind(&transcript.session_id)
            .bind(version)
            .bind(&messages)
            .bind(format_datetime(&transcript.created_at))
            .bind(format_datetime(&transcript.updated_at))
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?
        } else {
            let expected = i64::try_from(expected_version)
                .map_err(|_| StoreError::Query(format!("version overflow: {expected_version}")))?;
            sqlx::query(
                r#"UPDATE transcripts
                   SET version = ?, messages = ?, updated_at = ?
                   WHERE session_id = ? AND version = ?"#,
            )
            .bind(version)
            .bind(&messages)
            .bind(format_datetime(&transcript.updated_at))
            .bind(&transcript.session_id)
            .bind(expected)
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?
        };

        Ok(result.rows_affected() == 1)
    }
}
