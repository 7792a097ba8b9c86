//! Conversation orchestrator — the per-turn pipeline.
//!
//! One turn: read the knowledge record, compose the system context, window
//! the history, call the provider, parse the protocol response, merge any
//! extracted facts, and hand back a reply plus the accepted changes.
//!
//! The orchestrator never returns an error for a turn: every failure mode
//! (missing key, transport failure, empty completion) degrades to a
//! displayable reply, and the knowledge record is only touched on a fully
//! successful turn.

use crate::{merge, protocol};
use carbot_config::AppConfig;
use carbot_core::{
    ChangeSet, CompletionMessage, CompletionRequest, Error, HistoryStore, KnowledgeRecord,
    KnowledgeStore, Provider, Turn,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// The assistant's opening line for a fresh conversation.
pub const GREETING: &str = "Hi! I'm your car selling assistant. What brings you here today?";

/// Shown when no API key is configured anywhere.
pub const NO_API_KEY_REPLY: &str = "No API key configured. Set OPENROUTER_API_KEY (or add \
api_key to ~/.carbot/config.toml) and try again.";

/// Shown when the provider answered but the completion was empty.
pub const EMPTY_COMPLETION_REPLY: &str = "Sorry, I did not understand.";

/// The result of one conversation turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Text to show the user.
    pub reply: String,
    /// Fields whose stored value changed this turn. Empty on failures.
    pub changes: ChangeSet,
}

impl TurnOutcome {
    fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            changes: ChangeSet::new(),
        }
    }
}

/// A conversation session over a provider and a pair of stores.
///
/// The caller owns the history contract: the sanitized user turn is
/// appended *before* [`ChatSession::handle_turn`], and the returned reply
/// is appended after it. `provider` is `None` when no API key is
/// configured; the session still works, answering every turn with a
/// diagnostic.
pub struct ChatSession {
    provider: Option<Arc<dyn Provider>>,
    history: Arc<dyn HistoryStore>,
    knowledge: Arc<dyn KnowledgeStore>,
    config: AppConfig,
}

impl ChatSession {
    pub fn new(
        provider: Option<Arc<dyn Provider>>,
        history: Arc<dyn HistoryStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            provider,
            history,
            knowledge,
            config,
        }
    }

    /// Open a fresh conversation: when the history is empty, append the
    /// greeting as an assistant turn and return it. Returns `None` when the
    /// session already has turns, so re-opening never duplicates greetings.
    pub async fn maybe_greet(&self) -> Result<Option<String>, Error> {
        if self.history.read().await?.is_empty() {
            self.history.append(Turn::assistant(GREETING)).await?;
            Ok(Some(GREETING.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Wipe both stores. The next [`ChatSession::maybe_greet`] starts over.
    pub async fn reset(&self) -> Result<(), Error> {
        self.history.clear().await?;
        self.knowledge.clear().await?;
        debug!("Session reset");
        Ok(())
    }

    /// Run one turn of the pipeline.
    ///
    /// Expects the caller to have already appended the sanitized user turn
    /// to the history. Always produces a displayable outcome.
    pub async fn handle_turn(&self, user_text: &str) -> TurnOutcome {
        debug!(chars = user_text.chars().count(), "Handling user turn");

        let Some(provider) = &self.provider else {
            return TurnOutcome::reply_only(NO_API_KEY_REPLY);
        };

        let record = match self.knowledge.read().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to read knowledge record");
                return TurnOutcome::reply_only(format!("Error reading session state: {e}"));
            }
        };
        let history = match self.history.read().await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(error = %e, "Failed to read history");
                return TurnOutcome::reply_only(format!("Error reading session state: {e}"));
            }
        };

        let request = self.build_request(&record, &history);
        let response = match provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "Completion failed");
                return TurnOutcome::reply_only(format!(
                    "Error contacting {}: {e}",
                    provider.name()
                ));
            }
        };

        let raw = response.content.trim();
        if raw.is_empty() {
            return TurnOutcome::reply_only(EMPTY_COMPLETION_REPLY);
        }

        let parsed = protocol::parse(raw);
        let mut changes = ChangeSet::new();
        if let Some(delta) = parsed.delta {
            let (updated, accepted) = merge::merge(&record, &delta);
            match self.knowledge.write(&updated).await {
                Ok(()) => {
                    if !accepted.is_empty() {
                        debug!(fields = accepted.len(), "Knowledge record updated");
                    }
                    changes = accepted;
                }
                Err(e) => {
                    // The reply is still good; only the learning is lost.
                    warn!(error = %e, "Failed to persist knowledge record");
                }
            }
        }

        TurnOutcome {
            reply: parsed.reply,
            changes,
        }
    }

    /// Compose the system context and the windowed history into a request.
    fn build_request(&self, record: &KnowledgeRecord, history: &[Turn]) -> CompletionRequest {
        let mut messages = vec![CompletionMessage::system(self.system_context(record))];
        let start = history.len().saturating_sub(self.config.history_window);
        messages.extend(history[start..].iter().map(CompletionMessage::from));

        CompletionRequest {
            model: self.config.model.clone(),
            messages,
            params: self.config.generation,
        }
    }

    /// The base instructions, plus a known-user-info section when any facts
    /// have been learned.
    fn system_context(&self, record: &KnowledgeRecord) -> String {
        let known = record.render();
        if known.is_empty() {
            self.config.system_prompt().to_string()
        } else {
            format!(
                "{}\n\n## Known user info:\n{known}",
                self.config.system_prompt()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carbot_core::{CompletionResponse, ProviderError, TrackedField};
    use carbot_store::{InMemoryHistoryStore, InMemoryKnowledgeStore};
    use std::sync::Mutex;

    struct StubProvider {
        result: Result<String, ProviderError>,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl StubProvider {
        fn replying(content: impl Into<String>) -> Self {
            Self {
                result: Ok(content.into()),
                last_request: Mutex::new(None),
            }
        }

        fn failing(error: ProviderError) -> Self {
            Self {
                result: Err(error),
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            *self.last_request.lock().unwrap() = Some(request);
            match &self.result {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    model: "stub-model".into(),
                    usage: None,
                }),
                Err(e) => Err(e.clone()),
            }
        }
    }

    struct Session {
        session: ChatSession,
        provider: Arc<StubProvider>,
        history: Arc<InMemoryHistoryStore>,
        knowledge: Arc<InMemoryKnowledgeStore>,
    }

    fn session_with(provider: StubProvider) -> Session {
        let provider = Arc::new(provider);
        let provider_dyn: Arc<dyn Provider> = provider.clone();
        let history = Arc::new(InMemoryHistoryStore::new());
        let knowledge = Arc::new(InMemoryKnowledgeStore::new());
        let session = ChatSession::new(
            Some(provider_dyn),
            history.clone(),
            knowledge.clone(),
            AppConfig::default(),
        );
        Session {
            session,
            provider,
            history,
            knowledge,
        }
    }

    #[tokio::test]
    async fn successful_turn_returns_reply_and_changes() {
        let s = session_with(StubProvider::replying(
            r#"<reply>A Civic, nice choice!</reply><memory>{"intent":"buy","model":"Civic"}</memory>"#,
        ));
        s.history.append(Turn::user("I want a Civic")).await.unwrap();

        let outcome = s.session.handle_turn("I want a Civic").await;
        assert_eq!(outcome.reply, "A Civic, nice choice!");
        assert_eq!(outcome.changes.get(TrackedField::Intent), Some("buy"));
        assert_eq!(outcome.changes.get(TrackedField::Model), Some("Civic"));

        let record = s.knowledge.read().await.unwrap();
        assert_eq!(record.get(TrackedField::Model), Some("Civic"));
    }

    #[tokio::test]
    async fn no_provider_yields_diagnostic_without_side_effects() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let knowledge = Arc::new(InMemoryKnowledgeStore::new());
        let session = ChatSession::new(None, history, knowledge.clone(), AppConfig::default());

        let outcome = session.handle_turn("hello").await;
        assert_eq!(outcome.reply, NO_API_KEY_REPLY);
        assert!(outcome.changes.is_empty());
        assert!(knowledge.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_leaves_knowledge_untouched() {
        let s = session_with(StubProvider::failing(ProviderError::ApiError {
            status_code: 500,
            message: "Internal Server Error".into(),
        }));
        let mut record = KnowledgeRecord::new();
        record.set(TrackedField::Intent, "sell");
        s.knowledge.write(&record).await.unwrap();

        let outcome = s.session.handle_turn("hi").await;
        assert!(outcome.reply.starts_with("Error contacting stub:"));
        assert!(outcome.changes.is_empty());
        assert_eq!(s.knowledge.read().await.unwrap(), record);
    }

    #[tokio::test]
    async fn empty_completion_yields_fallback_reply() {
        let s = session_with(StubProvider::replying("   "));
        let outcome = s.session.handle_turn("hi").await;
        assert_eq!(outcome.reply, EMPTY_COMPLETION_REPLY);
    }

    #[tokio::test]
    async fn reply_without_memory_changes_nothing() {
        let s = session_with(StubProvider::replying("<reply>Tell me more.</reply>"));
        let outcome = s.session.handle_turn("hmm").await;
        assert_eq!(outcome.reply, "Tell me more.");
        assert!(outcome.changes.is_empty());
        assert!(s.knowledge.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_memory_still_returns_reply() {
        let s = session_with(StubProvider::replying(
            "<reply>Got it.</reply><memory>{broken</memory>",
        ));
        let outcome = s.session.handle_turn("ok").await;
        assert_eq!(outcome.reply, "Got it.");
        assert!(s.knowledge.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_carries_system_context_and_windowed_history() {
        let s = session_with(StubProvider::replying("<reply>ok</reply>"));
        for i in 0..15 {
            s.history.append(Turn::user(format!("m{i}"))).await.unwrap();
        }
        let mut record = KnowledgeRecord::new();
        record.set(TrackedField::Budget, "20000");
        s.knowledge.write(&record).await.unwrap();

        s.session.handle_turn("m14").await;

        let request = s.provider.last_request.lock().unwrap().take().unwrap();
        // System context plus the last 10 turns
        assert_eq!(request.messages.len(), 11);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("## Known user info:"));
        assert!(request.messages[0].content.contains("budget: 20000"));
        assert_eq!(request.messages[1].content, "m5");
        assert_eq!(request.messages[10].content, "m14");
        assert_eq!(request.model, "openai/gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn short_history_is_sent_whole() {
        let s = session_with(StubProvider::replying("<reply>ok</reply>"));
        s.history.append(Turn::assistant(GREETING)).await.unwrap();
        s.history.append(Turn::user("hi")).await.unwrap();

        s.session.handle_turn("hi").await;

        let request = s.provider.last_request.lock().unwrap().take().unwrap();
        assert_eq!(request.messages.len(), 3);
        assert!(!request.messages[0].content.contains("## Known user info:"));
    }

    #[tokio::test]
    async fn greeting_appends_once() {
        let s = session_with(StubProvider::replying("<reply>ok</reply>"));

        let first = s.session.maybe_greet().await.unwrap();
        assert_eq!(first.as_deref(), Some(GREETING));
        let second = s.session.maybe_greet().await.unwrap();
        assert!(second.is_none());

        let turns = s.history.read().await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, GREETING);
    }

    #[tokio::test]
    async fn reset_clears_both_stores_and_regreets() {
        let s = session_with(StubProvider::replying("<reply>ok</reply>"));
        s.session.maybe_greet().await.unwrap();
        s.history.append(Turn::user("I sell a Golf")).await.unwrap();
        let mut record = KnowledgeRecord::new();
        record.set(TrackedField::Intent, "sell");
        s.knowledge.write(&record).await.unwrap();

        s.session.reset().await.unwrap();
        assert!(s.history.read().await.unwrap().is_empty());
        assert!(s.knowledge.read().await.unwrap().is_empty());

        let greeted = s.session.maybe_greet().await.unwrap();
        assert_eq!(greeted.as_deref(), Some(GREETING));
    }

    #[tokio::test]
    async fn facts_accrete_across_turns() {
        let s = session_with(StubProvider::replying(
            r#"<reply>noted</reply><memory>{"budget":"18000"}</memory>"#,
        ));
        let mut record = KnowledgeRecord::new();
        record.set(TrackedField::Intent, "buy");
        s.knowledge.write(&record).await.unwrap();

        let outcome = s.session.handle_turn("budget is 18k").await;
        assert_eq!(outcome.changes.len(), 1);

        let stored = s.knowledge.read().await.unwrap();
        assert_eq!(stored.get(TrackedField::Intent), Some("buy"));
        assert_eq!(stored.get(TrackedField::Budget), Some("18000"));
    }
}
