//! Solace is a two-piece chat system: an HTTP relay that keeps the model
//! provider's API key server-side, and a terminal client that owns the
//! conversation.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation state, reply normalization, local
//!   persistence, and configuration.
//! - [`server`] is the relay: one chat endpoint, a health probe, and a root
//!   fallback that serves a bundled frontend when present.
//! - [`api`] defines the wire payloads and the upstream completion backend
//!   used by the relay.
//! - [`cli`] parses command-line arguments and runs the chat client, the
//!   one-shot `say` command, and the server.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod server;
pub mod utils;
