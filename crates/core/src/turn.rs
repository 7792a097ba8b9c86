//! Turn domain types.
//!
//! A `Turn` is one entry in the conversation log: who spoke and what they
//! said. Turns are the exact shape persisted by the History Store, so the
//! struct carries nothing beyond `role` and `content`.

use serde::{Deserialize, Serialize};

/// The role of a turn's speaker.
///
/// Earlier releases persisted assistant turns under the label `bot`. The
/// `alias` keeps old history files readable; the value is re-serialized as
/// `assistant` on the next write, so the relabeling happens exactly once,
/// at the deserialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    #[serde(alias = "bot")]
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("I want to sell my car");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "I want to sell my car");
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::assistant("What's your budget?");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }

    #[test]
    fn legacy_bot_role_normalized_on_read() {
        let turn: Turn = serde_json::from_str(r#"{"role":"bot","content":"Hi!"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);

        // Re-serializing writes the canonical label
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        assert!(!json.contains("bot"));
    }
}
