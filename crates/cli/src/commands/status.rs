//! `carbot status` — Show configuration and session state.

use carbot_config::AppConfig;
use carbot_core::{HistoryStore, KnowledgeStore, Provider};
use carbot_store::{FileHistoryStore, FileKnowledgeStore};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("carbot Status");
    println!("=============");
    println!("  Config dir:  {}", AppConfig::config_dir().display());
    println!("  Endpoint:    {}", config.api_url);
    println!("  Model:       {}", config.model);
    println!("  API key:     {}", if config.has_api_key() { "configured" } else { "missing" });
    println!("  Window:      last {} turns per request", config.history_window);

    let history = FileHistoryStore::new(AppConfig::history_path());
    let turns = history.read().await?;
    println!("  History:     {} turn(s) stored", turns.len());

    let knowledge = FileKnowledgeStore::new(AppConfig::knowledge_path());
    let record = knowledge.read().await?;
    if record.is_empty() {
        println!("  Known info:  nothing yet");
    } else {
        println!("  Known info:");
        for (field, value) in record.iter() {
            println!("    {}: {value}", field.label());
        }
    }

    match carbot_providers::build_provider(&config) {
        Some(provider) => match provider.health_check().await {
            Ok(true) => println!("\n  Provider reachable ({})", provider.name()),
            Ok(false) | Err(_) => println!("\n  Provider unreachable ({})", provider.name()),
        },
        None => println!("\n  No provider configured — set an API key first"),
    }

    Ok(())
}
