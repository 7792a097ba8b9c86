//! `carbot chat` — Interactive or single-message chat mode.

use std::sync::Arc;

use carbot_agent::{sanitize, ChatSession};
use carbot_config::AppConfig;
use carbot_core::{HistoryStore, Turn};
use carbot_store::{FileHistoryStore, FileKnowledgeStore};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Missing API key is not fatal — the session answers every turn with a
    // diagnostic — but say how to fix it up front.
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  WARNING: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY   (recommended)");
        eprintln!("    OPENAI_API_KEY       (for OpenAI direct)");
        eprintln!("    CARBOT_API_KEY       (generic)");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  Get an OpenRouter key at: https://openrouter.ai/keys");
        eprintln!();
    }

    let provider = carbot_providers::build_provider(&config);
    let history = Arc::new(FileHistoryStore::new(AppConfig::history_path()));
    let knowledge = Arc::new(FileKnowledgeStore::new(AppConfig::knowledge_path()));
    let session = ChatSession::new(provider, history.clone(), knowledge, config.clone());

    if let Some(msg) = message {
        // Single message mode
        let text = sanitize(&msg);
        if text.is_empty() {
            return Err("Nothing left to send after sanitization".into());
        }

        session.maybe_greet().await?;
        history.append(Turn::user(&text)).await?;

        eprint!("  Thinking...");
        let outcome = session.handle_turn(&text).await;
        eprint!("\r              \r");

        history.append(Turn::assistant(&outcome.reply)).await?;
        println!("{}", outcome.reply);
        print_changes(&outcome.changes);
    } else {
        // Interactive mode
        println!();
        println!("  carbot — Interactive Mode");
        println!();
        println!("  Model:    {}", config.model);
        println!("  History:  last {} turns sent per request", config.history_window);
        println!();
        println!("  Type your message and press Enter.");
        println!("  Type 'exit' or Ctrl+C to quit.");
        println!();

        if let Some(greeting) = session.maybe_greet().await? {
            println!("  Bot > {greeting}");
            println!();
        }

        use std::io::Write;
        loop {
            print!("  You > ");
            std::io::stdout().flush()?;

            let Some(line) = read_line().await? else {
                break; // EOF
            };
            if matches!(line.trim(), "exit" | "quit") {
                break;
            }

            let text = sanitize(&line);
            if text.is_empty() {
                continue;
            }

            history.append(Turn::user(&text)).await?;

            eprint!("  ...");
            let outcome = session.handle_turn(&text).await;
            eprint!("\r     \r");

            history.append(Turn::assistant(&outcome.reply)).await?;

            println!();
            for reply_line in outcome.reply.lines() {
                println!("  Bot > {reply_line}");
            }
            print_changes(&outcome.changes);
            println!();
        }

        println!();
        println!("  Goodbye!");
        println!();
    }

    Ok(())
}

/// Read one line from stdin without blocking the runtime. `None` on EOF.
async fn read_line() -> Result<Option<String>, Box<dyn std::error::Error>> {
    let result = tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        std::io::stdin().read_line(&mut buf).map(|n| (n, buf))
    })
    .await?;

    match result {
        Ok((0, _)) => Ok(None),
        Ok((_, buf)) => Ok(Some(buf)),
        Err(e) => Err(e.into()),
    }
}

fn print_changes(changes: &carbot_core::ChangeSet) {
    if changes.is_empty() {
        return;
    }
    let labels: Vec<_> = changes.iter().map(|(f, _)| f.label()).collect();
    println!("  [Memory updated: {}]", labels.join(", "));
}
