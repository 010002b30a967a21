//! The conversation store: owner of the ordered message list for the active
//! session, and the only writer of its persisted snapshot.
//!
//! Replies from the relay arrive in whichever shape the provider (or a
//! proxy in front of it) chose, so extraction runs through a fixed, ordered
//! list of shape matchers rather than trusting a single schema. Failures of
//! any kind are folded back into the conversation as assistant-role error
//! messages; the transcript doubles as the error log.

use serde_json::Value;
use std::fmt;

use crate::core::constants::CONVERSATION_KEY;
use crate::core::message::Message;
use crate::core::persistence::LocalStore;
use crate::core::relay_client::{RelayClient, RelayError};

/// A reply payload matched none of the accepted response shapes.
#[derive(Debug)]
pub struct NormalizeError {
    fields: Vec<String>,
}

impl NormalizeError {
    fn new(raw: &Value) -> Self {
        let fields = match raw.as_object() {
            Some(map) => map.keys().cloned().collect(),
            None => Vec::new(),
        };
        Self { fields }
    }
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected response format")?;
        if !self.fields.is_empty() {
            write!(f, " (top-level fields: {})", self.fields.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for NormalizeError {}

/// Extract the assistant reply from a raw relay payload.
///
/// Shapes are tried in priority order, first match wins:
/// 1. a top-level `response` string,
/// 2. a `content` array of blocks, taking the `text` of the first block,
/// 3. a `content` string,
/// 4. a top-level `text` string.
pub fn normalize_reply(raw: &Value) -> Result<Message, NormalizeError> {
    if let Some(text) = raw.get("response").and_then(Value::as_str) {
        return Ok(Message::assistant(text));
    }

    if let Some(blocks) = raw.get("content").and_then(Value::as_array) {
        if let Some(text) = blocks
            .first()
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
        {
            return Ok(Message::assistant(text));
        }
    } else if let Some(text) = raw.get("content").and_then(Value::as_str) {
        return Ok(Message::assistant(text));
    }

    if let Some(text) = raw.get("text").and_then(Value::as_str) {
        return Ok(Message::assistant(text));
    }

    Err(NormalizeError::new(raw))
}

/// Conversation state for one session: the message list, the editable
/// system prompt, and the in-flight flag. All storage reads and writes go
/// through here.
pub struct ConversationStore {
    messages: Vec<Message>,
    system_prompt: String,
    loading: bool,
    store: LocalStore,
}

impl ConversationStore {
    pub fn new(store: LocalStore, system_prompt: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: system_prompt.into(),
            loading: false,
            store,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Replace the session system prompt. Not persisted; a restart returns
    /// to the default.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Load the persisted snapshot, replacing the in-memory conversation
    /// only when it parses as a non-empty list of well-formed messages.
    /// Anything else is treated as "no saved conversation".
    pub fn restore(&mut self) {
        let Some(raw) = self.store.read(CONVERSATION_KEY) else {
            return;
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(saved) if !saved.is_empty() => self.messages = saved,
            Ok(_) => {}
            Err(err) => tracing::warn!("discarding saved conversation: {err}"),
        }
    }

    /// Append a user turn. Whitespace-only input is rejected without
    /// touching the conversation; accepted input is stored as typed. The
    /// append happens before any relay call and is never rolled back.
    pub fn append_user_message(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.push(Message::user(text));
        true
    }

    /// Send the full conversation through the relay and fold the outcome
    /// back in: a normalized assistant message on success, an inline error
    /// message on any failure. The loading flag covers the whole round
    /// trip.
    pub async fn submit(&mut self, relay: &RelayClient) {
        self.loading = true;
        let outcome = relay.send_chat(&self.messages, &self.system_prompt).await;
        self.complete_submission(outcome);
    }

    fn complete_submission(&mut self, outcome: Result<Value, RelayError>) {
        let reply = outcome.and_then(|raw| normalize_reply(&raw).map_err(RelayError::Format));
        match reply {
            Ok(message) => self.push(message),
            Err(err) => self.push(Message::assistant(format!(
                "Error: {err}. Please check the logs for more details."
            ))),
        }
        self.loading = false;
    }

    /// Write the current conversation to local storage. Persistence is
    /// fire-and-forget: a failed write is logged and the session continues.
    pub fn persist(&self) {
        let snapshot = match serde_json::to_string(&self.messages) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("failed to serialize conversation: {err}");
                return;
            }
        };
        if let Err(err) = self.store.write(CONVERSATION_KEY, &snapshot) {
            tracing::warn!("failed to persist conversation: {err}");
        }
    }

    /// Start a new chat: clear the in-memory conversation and delete the
    /// persisted snapshot.
    pub fn reset(&mut self) {
        self.messages.clear();
        if let Err(err) = self.store.remove(CONVERSATION_KEY) {
            tracing::warn!("failed to clear saved conversation: {err}");
        }
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.persist();
    }
}
