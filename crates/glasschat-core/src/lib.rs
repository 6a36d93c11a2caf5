pub mod ai;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod preferences;
pub mod provider;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use ai::{ChatBackend, ChatError, ChatReply, HttpChatBackend};
pub use config::Config;
pub use coordinator::{SendCoordinator, SendOutcome, SendState, SharedStore};
pub use preferences::{
    Appearance, BackgroundSettings, FileStore, KeyValueStore, MemoryStore, ThemeSettings,
};
pub use provider::PayloadField;
pub use state::{Conversation, ConversationId, Message, MessageId, Sender};
pub use store::{format_last_message_time, ConversationStore, StoreSnapshot};
