//! Client side of the text-generation service.
//!
//! [`ChatTransport`] is the seam to the service itself; [`GenerationClient`]
//! layers timeout, retry classification and exponential backoff on top of
//! any transport. [`OpenAiTransport`] is the production transport.

mod client;
mod openai;

pub use client::{GenerationClient, GenerationConfig};
pub use openai::{DEFAULT_BASE_URL, OpenAiTransport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call sampling options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the service to answer with a single JSON object.
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            json_mode: false,
        }
    }
}

impl CompletionOptions {
    /// JSON-only output at the given temperature.
    pub fn json(temperature: f32) -> Self {
        Self {
            temperature,
            max_tokens: None,
            json_mode: true,
        }
    }
}

/// A fully specified request as handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single transport call.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("service returned an empty response")]
    EmptyResponse,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether another attempt may succeed: empty responses, connection
    /// failures, timeouts, HTTP 5xx and HTTP 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmptyResponse | Self::Connect(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Other(_) => false,
        }
    }
}

/// A completion could not be obtained.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("generation failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("generation request rejected: {source}")]
    Rejected {
        #[source]
        source: TransportError,
    },
}

impl GenerationError {
    /// The transport failure of the final attempt.
    pub fn last_failure(&self) -> &TransportError {
        match self {
            Self::Exhausted { source, .. } | Self::Rejected { source } => source,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Sends one chat request to the generation service and returns the text
/// content of the reply.
///
/// Implementations perform exactly one attempt; retrying and timeouts are
/// the job of [`GenerationClient`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

// Must stay usable as `dyn ChatTransport`.
const _: () = {
    fn _assert_object_safe(_: &dyn ChatTransport) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(TransportError::EmptyResponse.is_retryable());
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::Connect("refused".into()).is_retryable());
        for status in [429, 500, 502, 503] {
            let err = TransportError::Status {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "{status} should be retryable");
        }
    }

    #[test]
    fn client_errors_are_final() {
        for status in [400, 401, 403, 404, 422] {
            let err = TransportError::Status {
                status,
                body: String::new(),
            };
            assert!(!err.is_retryable(), "{status} should not be retryable");
        }
        assert!(!TransportError::Other("bad body".into()).is_retryable());
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let json = serde_json::to_value(ChatMessage::system("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "hi"}));
    }
}
