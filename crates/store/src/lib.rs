//! Store implementations for carbot session state.
//!
//! Two backends for each of the [`carbot_core::HistoryStore`] and
//! [`carbot_core::KnowledgeStore`] traits:
//! - file-backed JSON (the default, survives across sessions)
//! - in-memory (for testing and ephemeral sessions)

pub mod file_backend;
pub mod in_memory;

pub use file_backend::{FileHistoryStore, FileKnowledgeStore};
pub use in_memory::{InMemoryHistoryStore, InMemoryKnowledgeStore};
