//! Provider trait — the abstraction over the completion endpoint.
//!
//! A Provider knows how to send a message sequence to an LLM and get one
//! complete response back. One outbound request per user turn; no streaming
//! and no automatic retries.
//!
//! Implementations: OpenAI-compatible (OpenRouter, OpenAI, any
//! `/v1/chat/completions` endpoint).

use crate::error::ProviderError;
use crate::turn::{Role, Turn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in the outbound sequence.
///
/// Unlike [`Turn`], which only ever carries the two persisted roles, the
/// outbound sequence also includes the composed system context, so the role
/// here is a plain string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

impl CompletionMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

impl From<&Turn> for CompletionMessage {
    fn from(turn: &Turn) -> Self {
        match turn.role {
            Role::User => Self::user(&turn.content),
            Role::Assistant => Self::assistant(&turn.content),
        }
    }
}

/// Fixed generation configuration sent with every request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    #[serde(default)]
    pub presence_penalty: f32,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    200
}
fn default_top_p() -> f32 {
    1.0
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// A complete request to the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "openai/gpt-3.5-turbo")
    pub model: String,

    /// The message sequence: system context followed by windowed history
    pub messages: Vec<CompletionMessage>,

    /// Generation configuration
    pub params: GenerationParams,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw model text (may embed the reply/memory protocol blocks)
    pub content: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The orchestrator calls `complete()` without knowing which backend is
/// being used — pure polymorphism, which also makes it trivial to test the
/// turn pipeline against a stub.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_params_defaults() {
        let params = GenerationParams::default();
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(params.max_tokens, 200);
        assert!((params.top_p - 1.0).abs() < f32::EPSILON);
        assert_eq!(params.frequency_penalty, 0.0);
        assert_eq!(params.presence_penalty, 0.0);
    }

    #[test]
    fn message_from_turn() {
        let msg = CompletionMessage::from(&Turn::assistant("Hello!"));
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "Hello!");

        let msg = CompletionMessage::from(&Turn::user("Hi"));
        assert_eq!(msg.role, "user");
    }

    #[test]
    fn legacy_bot_turn_converts_to_assistant_message() {
        let turn: Turn = serde_json::from_str(r#"{"role":"bot","content":"old"}"#).unwrap();
        let msg = CompletionMessage::from(&turn);
        assert_eq!(msg.role, "assistant");
    }
}
