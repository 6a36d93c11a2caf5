//! Send coordinator: drives one user message from input text to the
//! reconciled conversation.
//!
//! A send appends the user's message, awaits exactly one backend call and
//! then appends exactly one bot message, either the reply or a fixed error
//! text. At most one send is outstanding per coordinator; sends attempted
//! while busy are dropped, not queued.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use crate::ai::{ChatBackend, ChatError};
use crate::state::{ConversationId, Message};
use crate::store::ConversationStore;

/// Shown when the backend answers without a usable `response`.
pub const EMPTY_REPLY_FALLBACK: &str = "I'm sorry, I couldn't process your request.";

/// Appended to the conversation when the backend call fails.
pub const ERROR_REPLY_FALLBACK: &str =
    "Sorry, there was an error processing your request. Please try again later.";

/// Text of the transient error banner.
pub const SEND_ERROR_BANNER: &str = "Failed to send message. Please try again.";

pub type SharedStore = Arc<Mutex<ConversationStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
}

/// What happened to one call to [`SendCoordinator::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Empty text or no active conversation; nothing changed.
    Ignored,
    /// Another send was outstanding; nothing changed.
    Dropped,
    /// The backend replied; carries the appended bot message.
    Completed(Message),
    /// The backend call failed; carries the appended fallback message.
    Failed(Message),
}

impl SendOutcome {
    pub fn reply(&self) -> Option<&Message> {
        match self {
            SendOutcome::Completed(message) | SendOutcome::Failed(message) => Some(message),
            SendOutcome::Ignored | SendOutcome::Dropped => None,
        }
    }
}

/// Clears the busy flag when dropped, including on panic or cancellation.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct SendCoordinator {
    store: SharedStore,
    backend: Arc<dyn ChatBackend>,
    busy: Arc<AtomicBool>,
    error: Arc<Mutex<Option<String>>>,
}

impl SendCoordinator {
    pub fn new(store: SharedStore, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            store,
            backend,
            busy: Arc::new(AtomicBool::new(false)),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn state(&self) -> SendState {
        if self.is_busy() {
            SendState::Sending
        } else {
            SendState::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Banner text left by the last failed send, if any.
    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    pub fn dismiss_error(&self) {
        *lock(&self.error) = None;
    }

    /// Send `text` into whatever conversation is active right now.
    pub async fn send_active(&self, text: &str) -> SendOutcome {
        let active = lock(&self.store).active_id().cloned();
        self.send(active.as_ref(), text).await
    }

    pub async fn send(&self, conversation_id: Option<&ConversationId>, text: &str) -> SendOutcome {
        let Some(conversation_id) = conversation_id else {
            debug!("Ignoring send without an active conversation");
            return SendOutcome::Ignored;
        };
        if text.trim().is_empty() {
            debug!("Ignoring send with empty text");
            return SendOutcome::Ignored;
        }
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!(
                conversation_id = %conversation_id,
                "Dropping send while another is outstanding"
            );
            return SendOutcome::Dropped;
        };

        self.dismiss_error();
        lock(&self.store).append_message(conversation_id, Message::user(text));

        info!(conversation_id = %conversation_id, chars = text.chars().count(), "Sending message");
        let result = match AssertUnwindSafe(self.backend.send(text)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!(conversation_id = %conversation_id, "Chat backend panicked");
                Err(ChatError::Panicked)
            }
        };
        let outcome = match result {
            Ok(reply) => {
                let text = match reply.response {
                    Some(response) if !response.is_empty() => response,
                    _ => {
                        warn!(
                            conversation_id = %conversation_id,
                            "Backend reply had no response text"
                        );
                        EMPTY_REPLY_FALLBACK.to_string()
                    }
                };
                info!(conversation_id = %conversation_id, "Send completed");
                SendOutcome::Completed(Message::bot(text))
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Send failed");
                *lock(&self.error) = Some(SEND_ERROR_BANNER.to_string());
                SendOutcome::Failed(Message::bot(ERROR_REPLY_FALLBACK))
            }
        };

        if let Some(reply) = outcome.reply() {
            lock(&self.store).append_message(conversation_id, reply.clone());
        }
        outcome
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
