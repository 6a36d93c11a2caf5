//! Conversation store: the single owner and writer of all conversations.

use std::fmt::Display;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::state::{Conversation, ConversationId, Message, NEW_CONVERSATION_TITLE};

const DEFAULT_CONVERSATION_ID: &str = "1";
const DEFAULT_CONVERSATION_TITLE: &str = "General Assistant";
const DEFAULT_LAST_MESSAGE: &str = "How can I help you today?";

/// Immutable view of the store, published after every mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSnapshot {
    pub conversations: Vec<Conversation>,
    pub active_id: Option<ConversationId>,
}

impl StoreSnapshot {
    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active_id.as_ref()?;
        self.conversations.iter().find(|c| &c.id == id)
    }
}

pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_id: Option<ConversationId>,
    snapshots: watch::Sender<StoreSnapshot>,
}

impl ConversationStore {
    /// An empty store with no active conversation.
    pub fn empty() -> Self {
        let (snapshots, _) = watch::channel(StoreSnapshot::default());
        Self {
            conversations: Vec::new(),
            active_id: None,
            snapshots,
        }
    }

    /// The store as the app starts: one "General Assistant" conversation,
    /// greeted an hour ago, already active.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut default = Conversation::with_greeting(
            ConversationId::new(DEFAULT_CONVERSATION_ID),
            DEFAULT_CONVERSATION_TITLE,
            now - Duration::hours(1),
        );
        default.set_summary(DEFAULT_LAST_MESSAGE, now);

        let mut store = Self::empty();
        store.active_id = Some(default.id.clone());
        store.conversations.push(default);
        store.publish();
        store
    }

    pub fn list_conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active_id.as_ref()
    }

    pub fn get_active(&self) -> Option<&Conversation> {
        self.get(self.active_id.as_ref()?)
    }

    /// Points the active id at `id` without checking that it exists.
    pub fn set_active(&mut self, id: ConversationId) {
        debug!(conversation_id = %id, "Switching active conversation");
        self.active_id = Some(id);
        self.publish();
    }

    pub fn create_conversation(&mut self) -> ConversationId {
        let id = ConversationId::generate();
        let conversation =
            Conversation::with_greeting(id.clone(), NEW_CONVERSATION_TITLE, Utc::now());

        debug!(conversation_id = %id, "Created conversation");
        self.conversations.push(conversation);
        self.active_id = Some(id.clone());
        self.publish();
        id
    }

    /// Appends to the named conversation. Unknown ids are dropped silently.
    pub fn append_message(&mut self, conversation_id: &ConversationId, message: Message) {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| &c.id == conversation_id)
        else {
            debug!(conversation_id = %conversation_id, "Dropping message for unknown conversation");
            return;
        };

        debug!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            sender = message.sender.as_str(),
            "Appending message"
        );
        conversation.push(message);
        self.publish();
    }

    /// Case-insensitive filter over titles and last messages, in insertion order.
    pub fn search(&self, query: &str) -> Vec<&Conversation> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.conversations.iter().collect();
        }

        self.conversations
            .iter()
            .filter(|c| {
                c.title.to_lowercase().contains(&query)
                    || c
                        .last_message()
                        .map(|m| m.to_lowercase().contains(&query))
                        .unwrap_or(false)
            })
            .collect()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            conversations: self.conversations.clone(),
            active_id: self.active_id.clone(),
        }
    }

    /// Receiver that sees a fresh snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshots.subscribe()
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sidebar label for a conversation's last activity: the time for today,
/// the weekday within the last week, the date otherwise.
pub fn format_last_message_time<Tz>(time: Option<DateTime<Utc>>, now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(time) = time else {
        return String::new();
    };
    let local = time.with_timezone(&now.timezone());

    if local.date_naive() == now.date_naive() {
        return local.format("%H:%M").to_string();
    }

    let days = now.clone().signed_duration_since(local.clone()).num_days();
    if days < 7 {
        local.format("%a").to_string()
    } else {
        local.format("%b %-d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Sender, GREETING};

    #[test]
    fn test_new_store_has_active_default() {
        let store = ConversationStore::new();
        let active = store.get_active().unwrap();

        assert_eq!(store.list_conversations().len(), 1);
        assert_eq!(active.id.as_str(), "1");
        assert_eq!(active.title, "General Assistant");
        assert_eq!(active.messages().len(), 1);
        assert_eq!(active.messages()[0].sender, Sender::Bot);
        assert_eq!(active.last_message(), Some("How can I help you today?"));
    }

    #[test]
    fn test_empty_store_has_no_active() {
        let store = ConversationStore::empty();
        assert!(store.get_active().is_none());
        assert!(store.list_conversations().is_empty());
    }

    #[test]
    fn test_append_keeps_call_order() {
        let mut store = ConversationStore::empty();
        let id = store.create_conversation();

        for i in 0..5 {
            store.append_message(&id, Message::user(format!("message {}", i)));
        }

        let texts: Vec<&str> = store
            .get(&id)
            .unwrap()
            .messages()
            .iter()
            .skip(1)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(
            texts,
            vec!["message 0", "message 1", "message 2", "message 3", "message 4"]
        );
    }

    #[test]
    fn test_append_refreshes_summary() {
        let mut store = ConversationStore::new();
        let id = ConversationId::new("1");
        let message = Message::bot("latest");
        store.append_message(&id, message.clone());

        let conversation = store.get(&id).unwrap();
        assert_eq!(conversation.last_message(), Some("latest"));
        assert_eq!(conversation.last_message_time(), Some(message.timestamp));
    }

    #[test]
    fn test_append_to_unknown_conversation_is_noop() {
        let mut store = ConversationStore::new();
        let before = store.snapshot();
        store.append_message(&ConversationId::new("missing"), Message::user("lost"));

        assert_eq!(store.list_conversations(), before.conversations.as_slice());
    }

    #[test]
    fn test_create_conversation_becomes_active() {
        let mut store = ConversationStore::new();
        let id = store.create_conversation();

        assert_eq!(store.active_id(), Some(&id));
        let created = store.get_active().unwrap();
        assert_eq!(created.title, "New Conversation");
        assert_eq!(created.messages().len(), 1);
        assert_eq!(created.messages()[0].text, GREETING);
        assert_eq!(created.last_message(), None);
    }

    #[test]
    fn test_create_twice_yields_distinct_ids() {
        let mut store = ConversationStore::new();
        let first = store.create_conversation();
        let second = store.create_conversation();

        assert_ne!(first, second);
        assert_eq!(store.list_conversations().len(), 3);
        assert_eq!(store.list_conversations()[2].id, second);
        assert_eq!(store.active_id(), Some(&second));
    }

    #[test]
    fn test_set_active_does_not_validate() {
        let mut store = ConversationStore::new();
        store.set_active(ConversationId::new("ghost"));

        assert_eq!(store.active_id().map(|id| id.as_str()), Some("ghost"));
        assert!(store.get_active().is_none());
    }

    #[test]
    fn test_search_matches_title_and_last_message() {
        let mut store = ConversationStore::new();
        let id = store.create_conversation();
        store.append_message(&id, Message::user("Rust borrow checker question"));

        assert_eq!(store.search("").len(), 2);
        assert_eq!(store.search("GENERAL").len(), 1);

        let hits = store.search("borrow");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);
        assert!(store.search("nothing like this").is_empty());
    }

    #[test]
    fn test_subscribers_see_mutations() {
        let mut store = ConversationStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        let id = store.create_conversation();
        assert!(rx.has_changed().unwrap());

        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.conversations.len(), 2);
        assert_eq!(snapshot.active().map(|c| &c.id), Some(&id));
    }

    #[test]
    fn test_time_label_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 3, 15, 9, 5, 0).unwrap();
        assert_eq!(format_last_message_time(Some(time), now), "09:05");
    }

    #[test]
    fn test_time_label_this_week() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
        assert_eq!(format_last_message_time(Some(time), now), "Tue");
    }

    #[test]
    fn test_time_label_older() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(format_last_message_time(Some(time), now), "Jan 5");
    }

    #[test]
    fn test_time_label_missing() {
        assert_eq!(format_last_message_time(None, Utc::now()), "");
    }
}
