//! Interactive terminal chat client.
//!
//! A line-oriented loop standing in for the original browser UI: restore
//! the saved conversation, read input, submit, print the reply. Input is
//! only read between submissions, so at most one request is in flight.

use std::error::Error;
use std::io::{self, BufRead, Write};

use crate::core::config::Config;
use crate::core::constants::THEME_KEY;
use crate::core::conversation::ConversationStore;
use crate::core::message::{Message, Role};
use crate::core::persistence::LocalStore;
use crate::core::relay_client::RelayClient;

pub async fn run_chat(relay_url: Option<String>) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let store = LocalStore::open_default()?;
    let relay = RelayClient::new(relay_url.unwrap_or_else(|| config.relay_url()));

    let mut conversation = ConversationStore::new(store.clone(), config.default_system_prompt());
    conversation.restore();

    if conversation.messages().is_empty() {
        println!("Welcome to Solace. Ask me anything to get started.");
    } else {
        println!("Restoring your saved conversation:");
        println!();
        for message in conversation.messages() {
            print_message(message);
        }
    }
    println!("Commands: /new, /system [text], /theme [light|dark], /quit");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();

        if let Some(command) = input.strip_prefix('/') {
            if handle_command(command, &mut conversation, &store) {
                break;
            }
            continue;
        }

        // The untrimmed line is submitted as typed; whitespace-only input
        // never reaches the relay.
        if !conversation.append_user_message(&line) {
            continue;
        }
        conversation.submit(&relay).await;
        if let Some(reply) = conversation.messages().last() {
            print_message(reply);
        }
    }

    Ok(())
}

/// Dispatch a slash command. Returns true when the loop should exit.
fn handle_command(command: &str, conversation: &mut ConversationStore, store: &LocalStore) -> bool {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return true,
        "new" => {
            conversation.reset();
            println!("Started a new chat.");
        }
        "system" => {
            if arg.is_empty() {
                println!("System prompt: {}", conversation.system_prompt());
            } else {
                conversation.set_system_prompt(arg);
                println!("System prompt updated for this session.");
            }
        }
        "theme" => {
            let current = store
                .read(THEME_KEY)
                .unwrap_or_else(|| "light".to_string());
            let next = match arg {
                "" => {
                    if current == "dark" {
                        "light"
                    } else {
                        "dark"
                    }
                }
                "light" | "dark" => arg,
                other => {
                    println!("Unknown theme {other:?}; use light or dark.");
                    return false;
                }
            };
            match store.write(THEME_KEY, next) {
                Ok(()) => println!("Theme set to {next}."),
                Err(err) => println!("Could not save theme: {err}"),
            }
        }
        _ => {
            println!("Unknown command. Available: /new, /system [text], /theme [light|dark], /quit");
        }
    }

    false
}

fn print_message(message: &Message) {
    match message.role {
        Role::User => println!("you: {}", message.content),
        Role::Assistant => println!("solace: {}", message.content),
    }
    println!();
}
