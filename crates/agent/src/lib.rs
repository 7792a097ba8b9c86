//! The carbot conversation pipeline.
//!
//! Four pieces, composed by the [`ChatSession`] orchestrator:
//! - [`sanitize`] — cleans untrusted user input before it enters the session
//! - [`protocol`] — splits model completions into reply and fact delta
//! - [`merge`] — folds validated facts into the knowledge record
//! - [`chat`] — the per-turn pipeline itself

pub mod chat;
pub mod merge;
pub mod protocol;
pub mod sanitize;

pub use chat::{ChatSession, TurnOutcome, EMPTY_COMPLETION_REPLY, GREETING, NO_API_KEY_REPLY};
pub use merge::merge;
pub use protocol::{parse, ParsedResponse};
pub use sanitize::{sanitize, MAX_INPUT_LEN};
