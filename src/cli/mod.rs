//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod chat;
pub mod config;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Multi-agent LLM conversation orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a single agent
    Chat {
        /// Message to send (interactive mode when omitted)
        message: Option<String>,
        /// Provider to use (openai, anthropic, google)
        #[arg(short, long)]
        provider: Option<String>,
        /// Model identifier (defaults to the configured or provider default)
        #[arg(short, long)]
        model: Option<String>,
        /// System prompt for the agent
        #[arg(short, long)]
        system: Option<String>,
        /// Stream the response as it is generated
        #[arg(long)]
        stream: bool,
        /// Stop after this many messages in one conversation
        #[arg(long)]
        max_messages: Option<usize>,
    },
    /// Show the resolved configuration (API keys redacted)
    Config,
    /// Show version information
    Version,
}

/// Entry point for the CLI, called from main().
pub async fn run() -> Result<()> {
    // Load config early so we can respect the logging settings; fall back to
    // defaults if the config file is missing or unreadable.
    let logging_cfg = parley::config::Config::load()
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = parley::utils::init_logging(&logging_cfg) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Chat {
            message,
            provider,
            model,
            system,
            stream,
            max_messages,
        }) => {
            let options = chat::ChatOptions {
                provider,
                model,
                system,
                stream,
                max_messages,
            };
            chat::cmd_chat(message, options).await?;
        }
        Some(Commands::Config) => {
            config::cmd_config()?;
        }
        Some(Commands::Version) => {
            cmd_version();
        }
    }

    Ok(())
}

/// Display version information
fn cmd_version() {
    println!("parley {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Multi-agent LLM conversation orchestrator");
}
