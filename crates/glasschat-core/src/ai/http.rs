use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::backend::{ChatBackend, ChatError, ChatReply};
use crate::provider::PayloadField;

#[derive(Clone)]
pub struct HttpChatBackend {
    client: Client,
    endpoint: String,
    payload_field: PayloadField,
}

impl HttpChatBackend {
    pub fn new(endpoint: &str, payload_field: PayloadField) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            payload_field,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body(&self, text: &str) -> Value {
        let mut body = Map::new();
        body.insert(
            self.payload_field.as_str().to_string(),
            Value::String(text.to_string()),
        );
        Value::Object(body)
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, text: &str) -> Result<ChatReply, ChatError> {
        debug!(
            endpoint = %self.endpoint,
            field = self.payload_field.as_str(),
            "Posting chat message"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&self.body(text))
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ChatError::Decode(e.to_string()))
    }
}
