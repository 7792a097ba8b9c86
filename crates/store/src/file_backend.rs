//! File-based stores — persistent JSON storage.
//!
//! State is loaded into memory on creation and flushed to disk on every
//! mutation. This gives fast reads with durable, all-or-nothing writes.
//!
//! Storage locations (defaults): `~/.carbot/history.json` and
//! `~/.carbot/knowledge.json`.
//!
//! A missing file means an empty store. A corrupt file is logged and
//! treated as empty rather than aborting the session — the next write
//! replaces it.

use async_trait::async_trait;
use carbot_core::error::StoreError;
use carbot_core::knowledge::KnowledgeRecord;
use carbot_core::store::{HistoryStore, KnowledgeStore, HISTORY_CAP};
use carbot_core::turn::Turn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Load a JSON file into `T`, falling back to the default on absence or
/// corruption.
fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return T::default(), // File doesn't exist yet — start empty
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping corrupted store file");
            T::default()
        }
    }
}

/// Serialize `value` and write it to `path`, creating parent directories.
fn flush_to_disk<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Storage(format!("Failed to create store directory: {e}")))?;
    }

    let content = serde_json::to_string(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    std::fs::write(path, content)
        .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))
}

/// A file-backed conversation history, capped at [`HISTORY_CAP`] turns.
pub struct FileHistoryStore {
    path: PathBuf,
    turns: Arc<RwLock<Vec<Turn>>>,
}

impl FileHistoryStore {
    /// Open the history at the given path, loading any persisted turns.
    ///
    /// Legacy role labels are normalized here, as part of deserialization.
    pub fn new(path: PathBuf) -> Self {
        let turns: Vec<Turn> = load_or_default(&path);
        debug!(path = %path.display(), count = turns.len(), "History store loaded");
        Self {
            path,
            turns: Arc::new(RwLock::new(turns)),
        }
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn read(&self) -> Result<Vec<Turn>, StoreError> {
        Ok(self.turns.read().await.clone())
    }

    async fn append(&self, turn: Turn) -> Result<(), StoreError> {
        let mut turns = self.turns.write().await;
        turns.push(turn);
        while turns.len() > HISTORY_CAP {
            turns.remove(0); // FIFO eviction
        }
        flush_to_disk(&self.path, &*turns)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut turns = self.turns.write().await;
        turns.clear();
        flush_to_disk(&self.path, &*turns)
    }
}

/// A file-backed knowledge record.
pub struct FileKnowledgeStore {
    path: PathBuf,
    record: Arc<RwLock<KnowledgeRecord>>,
}

impl FileKnowledgeStore {
    /// Open the knowledge record at the given path.
    pub fn new(path: PathBuf) -> Self {
        let record: KnowledgeRecord = load_or_default(&path);
        debug!(path = %path.display(), fields = record.len(), "Knowledge store loaded");
        Self {
            path,
            record: Arc::new(RwLock::new(record)),
        }
    }
}

#[async_trait]
impl KnowledgeStore for FileKnowledgeStore {
    async fn read(&self) -> Result<KnowledgeRecord, StoreError> {
        Ok(self.record.read().await.clone())
    }

    async fn write(&self, record: &KnowledgeRecord) -> Result<(), StoreError> {
        let mut current = self.record.write().await;
        *current = record.clone();
        flush_to_disk(&self.path, &*current)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut current = self.record.write().await;
        *current = KnowledgeRecord::new();
        flush_to_disk(&self.path, &*current)
    }
}
