//! A [`ChatView`] that records calls instead of printing
//!
//! Used by controller tests to assert on what the user would have seen.

use crate::chat::{Chat, ChatId};
use crate::controller::chat_list::ChatListEntry;
use crate::view::ChatView;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// One call made on the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Messages rendered for a chat
    Messages { chat_id: ChatId, count: usize },
    Cleared,
    /// Chat list rendered; ids in display order
    ChatList(Vec<ChatId>),
    Model(String),
    Error(String),
    Info(String),
    Confirm(String),
}

/// Records every view call; answers confirmations with a fixed value
#[derive(Debug)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    answer: AtomicBool,
}

impl Default for RecordingView {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingView {
    /// Create a view that confirms every question
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            answer: AtomicBool::new(true),
        }
    }

    /// Set the answer given to later confirmations
    pub fn answer_confirm(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ViewEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, event: ViewEvent) {
        self.lock().push(event);
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.lock().clone()
    }

    /// Forget everything recorded so far
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Error notifications, oldest first
    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recent chat list render
    pub fn last_chat_list(&self) -> Option<Vec<ChatId>> {
        self.lock().iter().rev().find_map(|event| match event {
            ViewEvent::ChatList(ids) => Some(ids.clone()),
            _ => None,
        })
    }
}

impl ChatView for RecordingView {
    fn render_messages(&self, chat: &Chat) {
        self.push(ViewEvent::Messages {
            chat_id: chat.id.clone(),
            count: chat.messages.len(),
        });
    }

    fn clear_messages(&self) {
        self.push(ViewEvent::Cleared);
    }

    fn render_chat_list(&self, entries: &[ChatListEntry]) {
        self.push(ViewEvent::ChatList(
            entries.iter().map(|entry| entry.id.clone()).collect(),
        ));
    }

    fn set_model_indicator(&self, model: &str) {
        self.push(ViewEvent::Model(model.to_string()));
    }

    fn notify_error(&self, message: &str) {
        self.push(ViewEvent::Error(message.to_string()));
    }

    fn notify_info(&self, message: &str) {
        self.push(ViewEvent::Info(message.to_string()));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.push(ViewEvent::Confirm(prompt.to_string()));
        self.answer.load(Ordering::SeqCst)
    }
}
