use serde::{Deserialize, Serialize};

use crate::core::message::Role;

pub mod backend;

/// One conversation turn in the minimal `{role, content}` wire shape shared
/// by the relay endpoint and the upstream completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRelayRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(
        rename = "systemPrompt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub system_prompt: Option<String>,
}

/// Request body for the upstream completion API.
#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// Failure payload returned by the relay: a human-readable message, the
/// debug rendering, and the error source chain standing in for a stack
/// trace.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
    pub stack: String,
}

impl ErrorBody {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        Self {
            error: err.to_string(),
            details: format!("{err:?}"),
            stack: stack.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_request_uses_camel_case_prompt_field() {
        let request = ChatRelayRequest {
            messages: vec![ChatMessage {
                role: Role::User,
                content: "Hi".to_string(),
            }],
            system_prompt: Some("Be brief.".to_string()),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemPrompt"], "Be brief.");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn relay_request_prompt_is_optional() {
        let request: ChatRelayRequest =
            serde_json::from_str(r#"{"messages":[]}"#).expect("parse failed");
        assert!(request.system_prompt.is_none());
        assert!(request.messages.is_empty());
    }

    #[test]
    fn error_body_renders_the_source_chain() {
        let io_err = std::io::Error::other("disk on fire");
        let err = crate::core::persistence::PersistError::Write {
            path: "/tmp/x".into(),
            source: io_err,
        };

        let body = ErrorBody::from_error(&err);
        assert!(body.error.contains("failed to write"));
        assert!(body.stack.contains("caused by: disk on fire"));
    }
}
