//! `mailpilot chat` — Interactive or single-message chat.
//!
//! The orchestrator is stateless, so the interactive loop keeps the
//! conversation itself and hands it back on every turn, exactly as an HTTP
//! client would.

use mailpilot_config::AppConfig;
use mailpilot_core::message::{ChatMessage, HistoryEntry};
use mailpilot_gateway::GatewayState;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY     = 'sk-...'");
        eprintln!("    MAILPILOT_API_KEY  = 'sk-...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }
    if !config.has_imap_credentials() {
        eprintln!("  warning: IMAP credentials missing; inbox tools will fail.");
    }

    let state = GatewayState::from_config(&config)?;
    let orchestrator = state.orchestrator;

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let outcome = orchestrator.chat(&msg, &[]).await?;
        eprint!("\r              \r");
        if let Some(tool) = &outcome.tool_executed {
            eprintln!("  [tool: {}]", tool.name);
        }
        println!("{}", outcome.reply);
        return Ok(());
    }

    println!();
    println!("  mailpilot — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", orchestrator.model());
    println!("  Mailbox:   {}@{}", config.imap.username, config.imap.host);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let entries: Vec<HistoryEntry> = history.iter().cloned().map(HistoryEntry::from).collect();
        eprint!("  ...");
        match orchestrator.chat(line, &entries).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                println!();
                if let Some(tool) = &outcome.tool_executed {
                    println!("  [tool: {}]", tool.name);
                }
                for reply_line in outcome.reply.lines() {
                    println!("  Assistant > {reply_line}");
                }
                println!();
                history = outcome.history;
            }
            Err(e) => {
                // History is left as it was; the next attempt starts clean.
                debug!(error = ?e, "Turn failed");
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
