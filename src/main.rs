use clap::Parser;
use helpdesk::cli::{
    handle_ask, handle_completions, handle_config_init, run_chat, Cli, Commands, ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => helpdesk::cli::serve::run_serve(args).await,
        Commands::Chat(args) => run_chat(args).await,
        Commands::Ask(args) => handle_ask(args).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
