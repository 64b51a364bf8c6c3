//! Chat command handler (one-shot + interactive mode).

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use parley::agent::{Agent, MaxMessages};
use parley::config::Config;
use parley::providers::{ProviderKind, ProviderRegistry};
use parley::session::Message;

/// Flags of `parley chat`.
#[derive(Debug, Default)]
pub(crate) struct ChatOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub system: Option<String>,
    pub stream: bool,
    pub max_messages: Option<usize>,
}

fn build_agent(config: Config, options: &ChatOptions) -> Result<Agent> {
    let registry = ProviderRegistry::new(config);

    let mut builder = Agent::builder("Assistant").description("Command-line chat agent");
    if let Some(kind) = &options.provider {
        let kind: ProviderKind = kind.parse()?;
        builder = builder.provider(registry.get(kind)?);
    }
    if let Some(model) = &options.model {
        builder = builder.model(model);
    }
    if let Some(system) = &options.system {
        builder = builder.system_message(system);
    }
    if let Some(limit) = options.max_messages {
        builder = builder.termination(MaxMessages::new(limit));
    }

    Ok(builder.build_with(&registry)?)
}

/// Run one conversation and print the reply.
async fn converse(agent: &Agent, input: Vec<Message>, stream: bool) -> Result<Vec<Message>> {
    if stream {
        let mut print = |fragment: &str| {
            print!("{}", fragment);
            let _ = io::stdout().flush();
        };
        let history = agent.chat(input, Some(&mut print)).await?;
        println!();
        Ok(history)
    } else {
        let history = agent.chat(input, None).await?;
        if let Some(last) = history.last() {
            println!("{}", last.text());
        }
        Ok(history)
    }
}

/// One-shot or interactive chat with a single agent.
pub(crate) async fn cmd_chat(message: Option<String>, options: ChatOptions) -> Result<()> {
    let config = Config::load().with_context(|| "Failed to load configuration")?;
    let agent = build_agent(config, &options).with_context(|| {
        format!(
            "Failed to create agent (set an API key or add it to {:?})",
            Config::path()
        )
    })?;

    if let Some(msg) = message {
        converse(&agent, vec![Message::user(&msg)], options.stream).await?;
        return Ok(());
    }

    println!("Parley Interactive Chat ({} / {})", agent.provider().name(), agent.model());
    println!("Type your message and press Enter. Type 'quit' or 'exit' to stop.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut history: Vec<Message> = Vec::new();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                // EOF
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "quit" || input == "exit" {
                    println!("Goodbye!");
                    break;
                }

                let mut turn = history.clone();
                turn.push(Message::user(input));
                println!();
                match converse(&agent, turn, options.stream).await {
                    Ok(updated) => history = updated,
                    Err(e) => eprintln!("Error: {}", e),
                }
                println!();
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
    }

    Ok(())
}
