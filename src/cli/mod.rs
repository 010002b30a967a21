//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod chat;
pub mod say;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::backend::{AnthropicBackend, CompletionBackend};
use crate::cli::chat::run_chat;
use crate::cli::say::run_say;
use crate::core::config::Config;
use crate::server;
use crate::utils::logging;

#[derive(Parser)]
#[command(name = "solace")]
#[command(about = "A supportive-conversation chat relay and terminal client")]
#[command(
    long_about = "Solace is a small chat system in two pieces: a relay server that keeps the \
Anthropic API key out of clients, and a terminal chat client that talks to it.\n\n\
Environment Variables:\n\
  ANTHROPIC_API_KEY  Provider credential, read by the relay (a .env file works too)\n\
  PORT               Relay listen port (default 3005)\n\
  RUST_LOG           Log filter, e.g. info or solace=debug\n\n\
Client Commands:\n\
  /new               Start a new chat (clears the saved conversation)\n\
  /system [text]     Show or replace the system prompt for this session\n\
  /theme [light|dark] Toggle or set the saved theme preference\n\
  /quit              Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay server
    Serve {
        /// Listen port, overriding the config file and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Start the interactive chat client (default)
    Chat {
        /// Relay endpoint to talk to
        #[arg(long, value_name = "URL")]
        relay_url: Option<String>,
    },
    /// Send a single prompt and print the reply
    Say {
        /// The prompt text
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,

        /// Relay endpoint to talk to
        #[arg(long, value_name = "URL")]
        relay_url: Option<String>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat { relay_url: None }) {
        Commands::Serve { port } => {
            dotenvy::dotenv().ok();
            logging::init("info");

            let mut config = Config::load()?;
            if let Some(port) = port {
                config.port = port;
            }

            // A missing credential leaves the relay running degraded: the
            // health probe stays green and chat calls report the failure.
            let backend = match AnthropicBackend::from_env(&config) {
                Ok(backend) => Some(Arc::new(backend) as Arc<dyn CompletionBackend>),
                Err(err) => {
                    tracing::warn!("{err}");
                    None
                }
            };

            server::serve(config, backend).await
        }
        Commands::Chat { relay_url } => {
            logging::init("warn");
            run_chat(relay_url).await
        }
        Commands::Say { prompt, relay_url } => {
            logging::init("warn");
            run_say(prompt, relay_url).await
        }
    }
}
