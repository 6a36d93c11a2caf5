pub mod backend;
pub mod http;

pub use backend::{ChatBackend, ChatError, ChatReply};
pub use http::HttpChatBackend;
