use async_trait::async_trait;
use serde::Deserialize;

/// Remote chat-completion endpoint: one request, one reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, text: &str) -> Result<ChatReply, ChatError>;
}

/// Body of a successful reply. `response` may be missing or empty; the
/// caller decides what to show in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("chat backend returned status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("chat backend panicked")]
    Panicked,
}
