//! # Carbot Core
//!
//! Domain types, traits, and error definitions for the carbot conversational
//! car-buying/selling assistant. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod knowledge;
pub mod provider;
pub mod store;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError};
pub use knowledge::{ChangeSet, FactDelta, KnowledgeRecord, TrackedField, MAX_VALUE_LEN};
pub use provider::{
    CompletionMessage, CompletionRequest, CompletionResponse, GenerationParams, Provider, Usage,
};
pub use store::{HistoryStore, KnowledgeStore, HISTORY_CAP};
pub use turn::{Role, Turn};
