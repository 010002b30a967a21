//! One-shot "say" command for scripting and smoke tests.
//!
//! Sends a single prompt through the relay and prints the normalized reply.
//! Nothing is read from or written to the saved conversation.

use std::error::Error;

use crate::core::config::Config;
use crate::core::conversation::normalize_reply;
use crate::core::message::Message;
use crate::core::relay_client::RelayClient;

pub async fn run_say(
    prompt: Vec<String>,
    relay_url: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: solace say <prompt>");
        std::process::exit(1);
    }

    let config = Config::load()?;
    let relay = RelayClient::new(relay_url.unwrap_or_else(|| config.relay_url()));
    let messages = vec![Message::user(prompt)];

    let raw = match relay
        .send_chat(&messages, config.default_system_prompt())
        .await
    {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    match normalize_reply(&raw) {
        Ok(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
