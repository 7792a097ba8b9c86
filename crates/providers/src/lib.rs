//! Completion endpoint clients.
//!
//! One implementation covers everything the assistant talks to: any
//! OpenAI-compatible `/chat/completions` endpoint (OpenRouter by default).

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use carbot_config::AppConfig;
use std::sync::Arc;

/// Build the configured provider. Returns `None` when no API key is set —
/// the orchestrator turns that into its fixed diagnostic reply instead of
/// making a network call.
pub fn build_provider(config: &AppConfig) -> Option<Arc<dyn carbot_core::Provider>> {
    let api_key = config.api_key.as_deref()?;
    Some(Arc::new(OpenAiCompatProvider::new(
        "openrouter",
        &config.api_url,
        api_key,
    )))
}
