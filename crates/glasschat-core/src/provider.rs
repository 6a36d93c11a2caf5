use serde::{Deserialize, Serialize};

/// Name of the JSON field the user's text travels in.
///
/// Some chat backends expect `{ "message": ... }`, others `{ "prompt": ... }`;
/// the wire protocol is otherwise identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadField {
    #[default]
    Message,
    Prompt,
}

impl PayloadField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadField::Message => "message",
            PayloadField::Prompt => "prompt",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "message" => Some(PayloadField::Message),
            "prompt" => Some(PayloadField::Prompt),
            _ => None,
        }
    }

    pub fn all() -> Vec<PayloadField> {
        vec![PayloadField::Message, PayloadField::Prompt]
    }
}
