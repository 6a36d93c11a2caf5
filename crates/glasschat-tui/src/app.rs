use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glasschat_core::{
    Appearance, ChatBackend, ConversationId, ConversationStore, SendCoordinator, SendOutcome,
    SharedStore, StoreSnapshot,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Sidebar,
    Filter,
    /// Typing a custom `#RRGGBB` accent colour.
    Color,
}

/// Blur change per key press, in pixels.
pub const BLUR_STEP: i32 = 1;
/// Overlay opacity change per key press.
pub const OPACITY_STEP: f32 = 0.01;

const COLOR_INPUT_LEN: usize = 7;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,

    // Message input
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Custom accent colour prompt
    pub color_input: String,
    pub color_error: Option<String>,
    focus_before_color: FocusPane,

    // Sidebar state
    pub filter: String,
    pub sidebar_state: ListState,
    pub visible_ids: Vec<ConversationId>,

    // Chat pane state
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area
    pub chat_width: u16,  // inner width, for wrap calculations
    pub chat_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Data
    pub snapshot: StoreSnapshot,
    pub coordinator: SendCoordinator,
    pub send_task: Option<JoinHandle<SendOutcome>>,
    pub appearance: Appearance,
    pub endpoint: String,

    snapshots: watch::Receiver<StoreSnapshot>,
    rendered_messages: usize,
}

impl App {
    pub fn new(backend: Arc<dyn ChatBackend>, appearance: Appearance, endpoint: String) -> Self {
        let store: SharedStore = Arc::new(Mutex::new(ConversationStore::new()));
        let (snapshot, snapshots) = {
            let store = lock(&store);
            (store.snapshot(), store.subscribe())
        };
        let coordinator = SendCoordinator::new(store, backend);

        let mut app = Self {
            should_quit: false,
            focus: FocusPane::Input,

            input: String::new(),
            input_cursor: 0,

            color_input: String::new(),
            color_error: None,
            focus_before_color: FocusPane::Input,

            filter: String::new(),
            sidebar_state: ListState::default(),
            visible_ids: Vec::new(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            sidebar_area: None,
            animation_frame: 0,

            snapshot,
            coordinator,
            send_task: None,
            appearance,
            endpoint,

            snapshots,
            rendered_messages: 0,
        };
        app.refresh_sidebar();
        app
    }

    /// Receiver for store changes, for the event loop.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        lock(self.coordinator.store()).subscribe()
    }

    pub fn is_sending(&self) -> bool {
        self.coordinator.is_busy()
    }

    pub fn error(&self) -> Option<String> {
        self.coordinator.error()
    }

    /// Pull the latest store snapshot if it changed.
    pub fn refresh(&mut self) {
        if self.snapshots.has_changed().unwrap_or(false) {
            self.snapshot = self.snapshots.borrow_and_update().clone();
            self.refresh_sidebar();
        }

        let count = self
            .snapshot
            .active()
            .map(|c| c.messages().len())
            .unwrap_or(0);
        if count != self.rendered_messages {
            self.rendered_messages = count;
            self.scroll_chat_to_bottom();
        }
    }

    /// Recompute which conversations match the filter and keep the active one selected.
    pub fn refresh_sidebar(&mut self) {
        self.visible_ids = lock(self.coordinator.store())
            .search(&self.filter)
            .into_iter()
            .map(|c| c.id.clone())
            .collect();

        let active_idx = self
            .snapshot
            .active_id
            .as_ref()
            .and_then(|id| self.visible_ids.iter().position(|v| v == id));
        match active_idx {
            Some(i) => self.sidebar_state.select(Some(i)),
            None if self.visible_ids.is_empty() => self.sidebar_state.select(None),
            None => {
                let i = self.sidebar_state.selected().unwrap_or(0);
                self.sidebar_state
                    .select(Some(i.min(self.visible_ids.len() - 1)));
            }
        }
    }

    /// Hand the input line to the send coordinator on a background task.
    pub fn submit_input(&mut self) {
        if self.input.trim().is_empty() || self.is_sending() {
            return;
        }

        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;

        let coordinator = self.coordinator.clone();
        self.send_task = Some(tokio::spawn(async move {
            coordinator.send_active(&text).await
        }));
    }

    /// Reap the send task once it has finished.
    pub async fn poll_send_task(&mut self) {
        let finished = self
            .send_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.send_task.take() {
            match task.await {
                Ok(outcome) => tracing::debug!(?outcome, "Send task finished"),
                Err(e) => tracing::error!(error = %e, "Send task aborted"),
            }
        }
    }

    pub fn new_conversation(&mut self) {
        lock(self.coordinator.store()).create_conversation();
        self.filter.clear();
        self.focus = FocusPane::Input;
    }

    pub fn sidebar_down(&mut self) {
        let len = self.visible_ids.len();
        if len > 0 {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some((i + 1).min(len - 1)));
            self.activate_selected();
        }
    }

    pub fn sidebar_up(&mut self) {
        if !self.visible_ids.is_empty() {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some(i.saturating_sub(1)));
            self.activate_selected();
        }
    }

    fn activate_selected(&mut self) {
        let selected = self
            .sidebar_state
            .selected()
            .and_then(|i| self.visible_ids.get(i))
            .cloned();
        if let Some(id) = selected {
            if self.snapshot.active_id.as_ref() != Some(&id) {
                lock(self.coordinator.store()).set_active(id);
            }
        }
    }

    pub fn set_filter(&mut self, filter: String) {
        self.filter = filter;
        self.refresh_sidebar();
    }

    pub fn dismiss_error(&mut self) {
        self.coordinator.dismiss_error();
    }

    pub fn adjust_blur(&mut self, delta: i32) {
        self.appearance.step_blur(delta);
    }

    pub fn adjust_opacity(&mut self, delta: f32) {
        self.appearance.step_opacity(delta);
    }

    /// Open the colour prompt, prefilled with the current accent.
    pub fn open_color_prompt(&mut self) {
        if self.focus != FocusPane::Color {
            self.focus_before_color = self.focus;
        }
        self.color_input = self.appearance.theme().accent_color.clone();
        self.color_error = None;
        self.focus = FocusPane::Color;
    }

    pub fn close_color_prompt(&mut self) {
        self.color_input.clear();
        self.color_error = None;
        self.focus = self.focus_before_color;
    }

    pub fn push_color_char(&mut self, c: char) {
        if self.color_input.is_empty() && c != '#' {
            self.color_input.push('#');
        }
        if self.color_input.chars().count() < COLOR_INPUT_LEN {
            self.color_input.push(c);
        }
        self.color_error = None;
    }

    pub fn pop_color_char(&mut self) {
        self.color_input.pop();
        self.color_error = None;
    }

    /// Apply the typed colour; an invalid one keeps the prompt open with an error.
    pub fn submit_color(&mut self) {
        let color = self.color_input.clone();
        match self.appearance.change_accent_color(&color) {
            Ok(()) => self.close_color_prompt(),
            Err(e) => self.color_error = Some(e.to_string()),
        }
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = self.total_chat_lines().saturating_sub(visible_height);
    }

    /// Wrapped line count of the chat pane, including the thinking indicator.
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        if let Some(conversation) = self.snapshot.active() {
            for msg in conversation.messages() {
                total_lines = total_lines.saturating_add(1); // "You:" / "Bot:"
                for line in msg.text.lines() {
                    let char_count = line.chars().count();
                    total_lines = total_lines.saturating_add((char_count / wrap_width + 1) as u16);
                }
                total_lines = total_lines.saturating_add(1); // blank line after message
            }
        }

        if self.is_sending() {
            total_lines = total_lines.saturating_add(2);
        }
        total_lines
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use glasschat_core::{ChatError, ChatReply, MemoryStore, Sender};

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn send(&self, text: &str) -> Result<ChatReply, ChatError> {
            Ok(ChatReply::new(format!("echo: {}", text)))
        }
    }

    pub(crate) fn test_app() -> App {
        App::new(
            Arc::new(EchoBackend),
            Appearance::load(Box::new(MemoryStore::new())),
            "http://localhost/chat".to_string(),
        )
    }

    #[tokio::test]
    async fn test_submit_sends_and_clears_input() {
        let mut app = test_app();
        app.input = "hello".to_string();
        app.input_cursor = 5;

        app.submit_input();
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);

        let task = app.send_task.take().unwrap();
        let outcome = task.await.unwrap();
        assert_eq!(outcome.reply().map(|m| m.text.as_str()), Some("echo: hello"));

        app.refresh();
        let active = app.snapshot.active().unwrap();
        assert_eq!(active.messages().len(), 3);
        assert_eq!(active.messages()[1].sender, Sender::User);
    }

    #[tokio::test]
    async fn test_blank_input_is_not_submitted() {
        let mut app = test_app();
        app.input = "   ".to_string();
        app.submit_input();
        assert!(app.send_task.is_none());
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn test_new_conversation_is_selected() {
        let mut app = test_app();
        app.new_conversation();
        app.refresh();

        assert_eq!(app.visible_ids.len(), 2);
        assert_eq!(app.sidebar_state.selected(), Some(1));
        assert_eq!(app.snapshot.active().unwrap().title, "New Conversation");
    }

    #[tokio::test]
    async fn test_sidebar_navigation_switches_active() {
        let mut app = test_app();
        app.new_conversation();
        app.refresh();

        app.sidebar_up();
        app.refresh();
        assert_eq!(app.snapshot.active().unwrap().title, "General Assistant");

        app.sidebar_down();
        app.refresh();
        assert_eq!(app.snapshot.active().unwrap().title, "New Conversation");
    }

    #[tokio::test]
    async fn test_filter_narrows_sidebar() {
        let mut app = test_app();
        app.new_conversation();
        app.refresh();

        app.set_filter("general".to_string());
        assert_eq!(app.visible_ids.len(), 1);
        assert_eq!(app.visible_ids[0].as_str(), "1");

        app.set_filter(String::new());
        assert_eq!(app.visible_ids.len(), 2);
    }

    #[test]
    fn test_custom_color_prompt_applies_valid_colour() {
        let mut app = test_app();
        app.focus = FocusPane::Sidebar;
        app.open_color_prompt();
        assert_eq!(app.focus, FocusPane::Color);
        assert_eq!(app.color_input, "#3B82F6");

        app.color_input.clear();
        for c in "ef4444".chars() {
            app.push_color_char(c);
        }
        assert_eq!(app.color_input, "#ef4444");

        app.submit_color();
        assert_eq!(app.appearance.theme().accent_color, "#EF4444");
        assert_eq!(app.focus, FocusPane::Sidebar);
        assert!(app.color_input.is_empty());
    }

    #[test]
    fn test_custom_color_prompt_rejects_invalid_colour() {
        let mut app = test_app();
        app.open_color_prompt();
        app.pop_color_char();
        app.submit_color();

        assert_eq!(app.focus, FocusPane::Color);
        assert!(app.color_error.is_some());
        assert_eq!(app.appearance.theme().accent_color, "#3B82F6");
    }

    #[test]
    fn test_color_input_is_capped() {
        let mut app = test_app();
        app.open_color_prompt();
        app.push_color_char('0');
        assert_eq!(app.color_input, "#3B82F6");
    }

    #[test]
    fn test_animation_cycles() {
        let mut app = test_app();
        for _ in 0..3 {
            app.tick_animation();
        }
        assert_eq!(app.animation_frame, 0);
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
    }
}
