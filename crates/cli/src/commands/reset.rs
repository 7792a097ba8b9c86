//! `carbot reset` — Wipe the conversation and everything learned.

use std::sync::Arc;

use carbot_agent::ChatSession;
use carbot_config::AppConfig;
use carbot_store::{FileHistoryStore, FileKnowledgeStore};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let history = Arc::new(FileHistoryStore::new(AppConfig::history_path()));
    let knowledge = Arc::new(FileKnowledgeStore::new(AppConfig::knowledge_path()));
    let session = ChatSession::new(None, history, knowledge, config);

    session.reset().await?;
    println!("Conversation history and knowledge record cleared.");

    Ok(())
}
