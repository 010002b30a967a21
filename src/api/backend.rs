//! The upstream completion backend behind the relay.
//!
//! The relay deliberately returns whatever JSON the provider sent, so the
//! backend trait yields a raw [`serde_json::Value`]; response-shape handling
//! belongs to the client's normalization step.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;

use crate::api::{ChatMessage, CompletionRequest};
use crate::core::config::Config;
use crate::core::constants::API_KEY_ENV;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Errors raised by the completion backend.
#[derive(Debug)]
pub enum BackendError {
    /// The backend was never constructed, typically a missing credential at
    /// startup. Calls fail fast without touching the network.
    NotInitialized,
    /// The credential environment variable is unset or empty.
    MissingCredential { var: &'static str },
    /// The HTTP request to the provider failed outright.
    Http(reqwest::Error),
    /// The provider answered with a non-success status.
    Api { status: u16, body: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotInitialized => {
                write!(f, "completion backend was not initialized properly")
            }
            BackendError::MissingCredential { var } => {
                write!(f, "{var} is not set; real completions are unavailable")
            }
            BackendError::Http(err) => write!(f, "completion request failed: {err}"),
            BackendError::Api { status, body } => {
                write!(f, "completion API error {status}: {body}")
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Http(err) => Some(err),
            _ => None,
        }
    }
}

/// Seam between the relay and the model provider.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Forward a conversation and system prompt, returning the provider's
    /// response object unmodified.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<Value, BackendError>;
}

/// Backend speaking the Anthropic messages API.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.anthropic_base_url.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Construct the backend from the environment. This is the single place
    /// initialization can fail; callers decide whether a missing credential
    /// is fatal or just leaves the relay running degraded.
    pub fn from_env(config: &Config) -> Result<Self, BackendError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(BackendError::MissingCredential { var: API_KEY_ENV })?;
        Ok(Self::new(api_key, config))
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<Value, BackendError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            system: system_prompt.to_string(),
            messages: messages.to_vec(),
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(BackendError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(BackendError::Http)
    }
}
