//! SQLite persistence: connection pooling and the transcript store.

pub mod pool;
pub mod transcript;

pub use pool::DatabasePool;
pub use transcript::SqliteTranscriptStore;
