//! In-memory stores — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use carbot_core::error::StoreError;
use carbot_core::knowledge::KnowledgeRecord;
use carbot_core::store::{HistoryStore, KnowledgeStore, HISTORY_CAP};
use carbot_core::turn::Turn;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory history log with the same FIFO cap as the file backend.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    turns: Arc<RwLock<Vec<Turn>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn read(&self) -> Result<Vec<Turn>, StoreError> {
        Ok(self.turns.read().await.clone())
    }

    async fn append(&self, turn: Turn) -> Result<(), StoreError> {
        let mut turns = self.turns.write().await;
        turns.push(turn);
        while turns.len() > HISTORY_CAP {
            turns.remove(0);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.turns.write().await.clear();
        Ok(())
    }
}

/// An in-memory knowledge record.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    record: Arc<RwLock<KnowledgeRecord>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn read(&self) -> Result<KnowledgeRecord, StoreError> {
        Ok(self.record.read().await.clone())
    }

    async fn write(&self, record: &KnowledgeRecord) -> Result<(), StoreError> {
        *self.record.write().await = record.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.record.write().await = KnowledgeRecord::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbot_core::knowledge::TrackedField;

    #[tokio::test]
    async fn history_append_and_read() {
        let store = InMemoryHistoryStore::new();
        store.append(Turn::user("Hi")).await.unwrap();
        store.append(Turn::assistant("Hello!")).await.unwrap();

        let turns = store.read().await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "Hello!");
    }

    #[tokio::test]
    async fn history_evicts_oldest_first() {
        let store = InMemoryHistoryStore::new();
        for i in 0..(HISTORY_CAP + 3) {
            store.append(Turn::user(format!("m{i}"))).await.unwrap();
        }

        let turns = store.read().await.unwrap();
        assert_eq!(turns.len(), HISTORY_CAP);
        assert_eq!(turns[0].content, "m3");
    }

    #[tokio::test]
    async fn knowledge_write_read_clear() {
        let store = InMemoryKnowledgeStore::new();
        let mut record = KnowledgeRecord::new();
        record.set(TrackedField::Model, "Civic");
        store.write(&record).await.unwrap();

        assert_eq!(store.read().await.unwrap().get(TrackedField::Model), Some("Civic"));

        store.clear().await.unwrap();
        assert!(store.read().await.unwrap().is_empty());
    }
}
