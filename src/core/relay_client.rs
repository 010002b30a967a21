//! Client-side caller for the relay's chat endpoint.

use reqwest::Client;
use serde_json::Value;
use std::fmt;

use crate::api::{ChatMessage, ChatRelayRequest};
use crate::core::message::Message;

/// Failure taxonomy for a submission as seen from the client: transport,
/// relay-reported, or an unrecognizable reply shape.
#[derive(Debug)]
pub enum RelayError {
    /// The HTTP round trip to the relay failed.
    Http(reqwest::Error),
    /// The relay answered with a failure status and (usually) an error body.
    Api { status: u16, message: String },
    /// The reply matched none of the accepted response shapes.
    Format(crate::core::conversation::NormalizeError),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Http(err) => write!(f, "request failed: {err}"),
            RelayError::Api { message, .. } => write!(f, "API error: {message}"),
            RelayError::Format(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Http(err) => Some(err),
            RelayError::Format(err) => Some(err),
            RelayError::Api { .. } => None,
        }
    }
}

/// Thin wrapper over `POST {relay}/api/chat`.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Send the full conversation and system prompt, returning the relay's
    /// raw JSON payload on success.
    pub async fn send_chat(
        &self,
        messages: &[Message],
        system_prompt: &str,
    ) -> Result<Value, RelayError> {
        let request = ChatRelayRequest {
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            system_prompt: Some(system_prompt.to_string()),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(RelayError::Http)?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(RelayError::Http)?;

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(RelayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(payload)
    }
}
