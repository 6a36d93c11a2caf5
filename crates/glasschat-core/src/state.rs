//! UI-agnostic conversation types
//!
//! This module contains the data structures shared by every front end
//! (terminal UI, tests, JSON dumps) and doesn't depend on any UI framework.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock;

/// Greeting the bot opens every conversation with.
pub const GREETING: &str = "Hello! How can I help you today?";

/// Title given to conversations created from the UI.
pub const NEW_CONVERSATION_TITLE: &str = "New Conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Fresh id from the process clock, greater than every id handed out before.
    pub fn next() -> Self {
        Self(clock::next_millis().max(0) as u64)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `conv-<millis>` from the process clock.
    pub fn generate() -> Self {
        Self(format!("conv-{}", clock::next_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

/// A single immutable chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self::at(sender, text, Utc::now())
    }

    pub fn at(sender: Sender, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::next(),
            text: text.into(),
            sender,
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }
}

/// An append-only thread of messages with a cached summary of the latest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    messages: Vec<Message>,
    last_message: Option<String>,
    last_message_time: Option<DateTime<Utc>>,
    pub unread_count: u32,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            last_message: None,
            last_message_time: None,
            unread_count: 0,
        }
    }

    /// A conversation opened with the bot greeting, timestamped `created_at`.
    ///
    /// The summary fields are left empty; they only fill in once something is
    /// appended through [`Conversation::push`].
    pub fn with_greeting(
        id: ConversationId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut conversation = Self::new(id, title);
        conversation
            .messages
            .push(Message::at(Sender::Bot, GREETING, created_at));
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn last_message_time(&self) -> Option<DateTime<Utc>> {
        self.last_message_time
    }

    pub(crate) fn set_summary(&mut self, text: impl Into<String>, time: DateTime<Utc>) {
        self.last_message = Some(text.into());
        self.last_message_time = Some(time);
    }

    /// Append a message and refresh the summary fields from it.
    pub(crate) fn push(&mut self, message: Message) {
        self.last_message = Some(message.text.clone());
        self.last_message_time = Some(message.timestamp);
        self.messages.push(message);
    }
}
