//! Store traits — durable session state.
//!
//! Two small key-value stores back the assistant across sessions: the
//! bounded conversation log and the knowledge record. Both are only ever
//! mutated from the single sequential turn flow, so implementations need
//! interior mutability but no cross-task coordination.
//!
//! Implementations: file-backed JSON, in-memory (for testing).

use crate::error::StoreError;
use crate::knowledge::KnowledgeRecord;
use crate::turn::Turn;
use async_trait::async_trait;

/// Maximum number of turns retained in history. Oldest evicted first.
pub const HISTORY_CAP: usize = 20;

/// The bounded, ordered log of conversation turns.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Read the full retained history, oldest first. Roles are already
    /// normalized (legacy labels translated on read).
    async fn read(&self) -> std::result::Result<Vec<Turn>, StoreError>;

    /// Append a turn, evicting the oldest entry once the log exceeds
    /// [`HISTORY_CAP`].
    async fn append(&self, turn: Turn) -> std::result::Result<(), StoreError>;

    /// Discard all retained turns.
    async fn clear(&self) -> std::result::Result<(), StoreError>;
}

/// The durable mapping of tracked field → latest known value.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Read the current record (empty when nothing is known).
    async fn read(&self) -> std::result::Result<KnowledgeRecord, StoreError>;

    /// Replace the stored record, all-or-nothing.
    async fn write(&self, record: &KnowledgeRecord) -> std::result::Result<(), StoreError>;

    /// Reset the record to empty.
    async fn clear(&self) -> std::result::Result<(), StoreError>;
}
