//! Terminal chat (`chat`) and one-shot (`ask`) commands

use crate::api::ChatResponse;
use crate::cli::config::load_config;
use crate::cli::output::{format_quota_table, format_route_line, format_stats_table};
use crate::cli::serve::init_tracing;
use crate::cli::{AskArgs, ChatArgs, CoreArgs};
use crate::config::HelpdeskConfig;
use crate::router::Orchestrator;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

/// REPL commands recognised before a line is sent as a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quota,
    Stats,
    NewSession,
    Quit,
    Help,
    Unknown(String),
}

impl ReplCommand {
    /// `None` when the line is a regular message.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let command = line.strip_prefix('/')?;
        Some(match command.to_lowercase().as_str() {
            "quota" => ReplCommand::Quota,
            "stats" => ReplCommand::Stats,
            "new" => ReplCommand::NewSession,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "help" | "?" => ReplCommand::Help,
            _ => ReplCommand::Unknown(line.to_string()),
        })
    }
}

const REPL_HELP: &str = "/quota  show today's model budget\n/stats  gateway counters\n/new    start a new session\n/quit   leave";

/// Interactive use keeps logs quiet unless a level is requested.
fn prepare(core: &CoreArgs) -> Result<(HelpdeskConfig, Orchestrator), Box<dyn std::error::Error>> {
    let mut config = load_config(core)?;
    if core.log_level.is_none() {
        config.logging.level = "warn".to_string();
    }
    init_tracing(&config.logging)?;
    let orchestrator = Orchestrator::builder(config.clone()).build()?;
    Ok((config, orchestrator))
}

/// Handle `helpdesk chat`
pub async fn run_chat(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, orchestrator) = prepare(&args.core)?;
    let mut session_id = args
        .session
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    println!(
        "{} (provider: {}, session {})",
        "Helpdesk chat".bold(),
        orchestrator.provider_name(),
        session_id
    );
    println!("Type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match ReplCommand::parse(&line) {
            Some(ReplCommand::Quit) => break,
            Some(ReplCommand::Quota) => {
                println!("{}", format_quota_table(&orchestrator.quota_snapshot()));
            }
            Some(ReplCommand::Stats) => {
                println!(
                    "{}",
                    format_stats_table(
                        &orchestrator.gateway_stats(),
                        orchestrator.session_count(),
                        orchestrator.cache_len()
                    )
                );
            }
            Some(ReplCommand::NewSession) => {
                orchestrator.end_session(&session_id);
                session_id = Uuid::new_v4().to_string();
                println!("Started session {}", session_id);
            }
            Some(ReplCommand::Help) => println!("{}", REPL_HELP),
            Some(ReplCommand::Unknown(command)) => {
                println!("Unknown command {}. Try /help.", command.yellow());
            }
            None => {
                let outcome = orchestrator.handle_message(&session_id, &line).await;
                println!("{}", outcome.response);
                if args.show_route {
                    println!("{}", format_route_line(&outcome).dimmed());
                }
            }
        }
    }

    orchestrator.end_session(&session_id);
    Ok(())
}

/// Handle `helpdesk ask`
pub async fn handle_ask(args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, orchestrator) = prepare(&args.core)?;
    let message = args.message.join(" ");
    let session_id = Uuid::new_v4().to_string();

    let outcome = orchestrator.handle_message(&session_id, &message).await;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ChatResponse::from(outcome))?
        );
    } else {
        println!("{}", outcome.response);
        println!("{}", format_route_line(&outcome));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repl_commands() {
        assert_eq!(ReplCommand::parse("/quota"), Some(ReplCommand::Quota));
        assert_eq!(ReplCommand::parse(" /STATS "), Some(ReplCommand::Stats));
        assert_eq!(ReplCommand::parse("/new"), Some(ReplCommand::NewSession));
        assert_eq!(ReplCommand::parse("/exit"), Some(ReplCommand::Quit));
        assert_eq!(
            ReplCommand::parse("/reset"),
            Some(ReplCommand::Unknown("/reset".to_string()))
        );
    }

    #[test]
    fn test_messages_are_not_commands() {
        assert_eq!(ReplCommand::parse("hello"), None);
        assert_eq!(ReplCommand::parse("add user Jo / manager"), None);
    }
}
