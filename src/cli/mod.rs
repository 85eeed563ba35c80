//! CLI module for the helpdesk router
//!
//! # Commands
//!
//! - `serve` - Start the HTTP API
//! - `chat` - Interactive session in the terminal
//! - `ask` - Handle a single message and exit
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start the server with a daily budget of 20 model calls
//! helpdesk serve --daily-limit 20
//!
//! # One-off question with routing diagnostics as JSON
//! helpdesk ask --json "John Doe,john@hotel.com,555-1234,manager"
//!
//! # Generate shell completions
//! helpdesk completions bash > ~/.bash_completion.d/helpdesk
//! ```

pub mod chat;
pub mod completions;
pub mod config;
pub mod output;
pub mod serve;

pub use chat::{handle_ask, run_chat};
pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Helpdesk - pattern-first support bot router
#[derive(Parser, Debug)]
#[command(
    name = "helpdesk",
    version,
    about = "Pattern-first support bot with a quota-conserving model gateway"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),
    /// Chat with the bot in the terminal
    Chat(ChatArgs),
    /// Send one message and print the reply
    Ask(AskArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that builds the routing core.
#[derive(Args, Debug, Clone)]
pub struct CoreArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "helpdesk.toml")]
    pub config: PathBuf,

    /// Override the daily model-call limit
    #[arg(long)]
    pub daily_limit: Option<u32>,

    /// Never call the language model
    #[arg(long)]
    pub offline: bool,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HELPDESK_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub core: CoreArgs,

    /// Override server port
    #[arg(short, long, env = "HELPDESK_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "HELPDESK_HOST")]
    pub host: Option<String>,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub core: CoreArgs,

    /// Resume or name the session (random when omitted)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Print the routing path after every reply
    #[arg(long)]
    pub show_route: bool,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub core: CoreArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Message to send
    #[arg(required = true, trailing_var_arg = true)]
    pub message: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "helpdesk.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["helpdesk", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.core.config, PathBuf::from("helpdesk.toml"));
                assert!(args.port.is_none());
                assert!(!args.core.offline);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from([
            "helpdesk",
            "serve",
            "-p",
            "9000",
            "--daily-limit",
            "5",
            "--offline",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(9000));
                assert_eq!(args.core.daily_limit, Some(5));
                assert!(args.core.offline);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_ask_joins_words() {
        let cli = Cli::try_parse_from(["helpdesk", "ask", "--json", "list", "all", "users"]).unwrap();
        match cli.command {
            Commands::Ask(args) => {
                assert!(args.json);
                assert_eq!(args.message.join(" "), "list all users");
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_cli_parse_ask_requires_message() {
        assert!(Cli::try_parse_from(["helpdesk", "ask"]).is_err());
    }

    #[test]
    fn test_cli_parse_chat_session() {
        let cli = Cli::try_parse_from(["helpdesk", "chat", "-s", "desk-1", "--show-route"]).unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.session.as_deref(), Some("desk-1"));
                assert!(args.show_route);
            }
            _ => panic!("Expected Chat command"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["helpdesk", "config", "init", "-o", "x.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Init(ConfigInitArgs { force: false, .. }))
        ));
    }
}
