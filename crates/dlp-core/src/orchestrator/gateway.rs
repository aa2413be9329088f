//! Narrow seam to the external chat-completion service.

use crate::prompts::PromptEnvelope;

/// Failure of a single completion call. `Display` is the bare cause text so it can be
/// surfaced to the user as `System Error: <cause>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The bounded wait elapsed before a response arrived.
    #[error("{0}")]
    Timeout(String),
    /// Connection refused, DNS failure, reset, or any other send failure.
    #[error("{0}")]
    Transport(String),
    /// The service answered with a non-success HTTP status.
    #[error("{0}")]
    Status(String),
    /// The body could not be decoded or carried no generated text.
    #[error("{0}")]
    MalformedResponse(String),
}

impl GatewayError {
    pub fn timeout(cause: impl Into<String>) -> Self {
        Self::Timeout(cause.into())
    }

    pub fn transport(cause: impl Into<String>) -> Self {
        Self::Transport(cause.into())
    }

    /// Short classification for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// One operation: given a system and user message, return generated text or fail.
/// Implementations make at most one attempt per call and hold no per-call state.
#[async_trait::async_trait]
pub trait LlmGateway: Send + Sync {
    /// Identifier of the model or backend (for status and logs).
    fn model(&self) -> &str;

    async fn complete(&self, envelope: &PromptEnvelope) -> Result<String, GatewayError>;
}
