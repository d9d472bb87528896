//! `mailpilot doctor` — Diagnose configuration and connectivity.

use mailpilot_config::AppConfig;
use mailpilot_core::mail::MailRetrieval;
use mailpilot_mail::ImapMailbox;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("mailpilot doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ok   Config file found");
    } else {
        println!("  --   No config file (defaults + environment) — run `mailpilot onboard`");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ok   Config valid");
            config
        }
        Err(e) => {
            println!("  FAIL Config invalid: {e}");
            println!("\n  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    // Model endpoint
    if config.has_api_key() {
        println!("  ok   API key configured");
        let router = mailpilot_providers::build_from_config(&config);
        match router.default() {
            Some(provider) => match provider.health_check().await {
                Ok(true) => println!("  ok   Provider '{}' reachable", provider.name()),
                Ok(false) => {
                    println!("  FAIL Provider '{}' rejected the health check", provider.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  FAIL Provider '{}' unreachable: {e}", provider.name());
                    issues += 1;
                }
            },
            None => {
                println!("  FAIL No provider named '{}'", config.default_provider);
                issues += 1;
            }
        }
    } else {
        println!("  FAIL No API key — set OPENAI_API_KEY or api_key in config.toml");
        issues += 1;
    }

    // Mailbox
    if config.has_imap_credentials() {
        let mailbox = ImapMailbox::new(&config.imap);
        match mailbox.unread_count().await {
            Ok(count) => println!(
                "  ok   IMAP {}@{}: {count} unread",
                config.imap.username, config.imap.host
            ),
            Err(e) => {
                println!("  FAIL IMAP {}: {e}", config.imap.host);
                issues += 1;
            }
        }
    } else {
        println!("  FAIL IMAP credentials missing — set [imap] username/password");
        issues += 1;
    }

    if config.smtp.username.is_empty() || config.smtp.password.is_none() {
        println!("  FAIL SMTP credentials missing — set [smtp] username/password");
        issues += 1;
    } else {
        println!("  ok   SMTP configured for {}:{}", config.smtp.host, config.smtp.port);
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
