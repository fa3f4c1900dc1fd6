//! Session state: the chat store, the active chat pointer and the selected model
//!
//! All mutations here are synchronous. Controllers hold the state behind a
//! lock and call these methods in short critical sections, doing any network
//! work outside of them.

use crate::chat::store::ChatStore;
use crate::chat::types::{Chat, ChatId, Message, DEFAULT_TITLE};
use crate::error::{ParlorError, Result};
use chrono::{DateTime, Utc};

/// Explicit per-session state shared by the controllers
#[derive(Debug, Clone)]
pub struct SessionState {
    store: ChatStore,
    active: Option<ChatId>,
    selected_model: String,
}

impl SessionState {
    /// Create an empty session with the given model selected
    pub fn new(selected_model: impl Into<String>) -> Self {
        Self {
            store: ChatStore::new(),
            active: None,
            selected_model: selected_model.into(),
        }
    }

    /// Replace the store wholesale (used by bootstrap)
    ///
    /// Chats without a model take the selected model. The active pointer is
    /// cleared; callers pick a chat afterwards.
    pub fn populate(&mut self, mut store: ChatStore) {
        let ids: Vec<ChatId> = store.sorted().iter().map(|c| c.id.clone()).collect();
        for id in ids {
            if let Some(chat) = store.get_mut(&id) {
                if chat.model.is_empty() {
                    chat.model = self.selected_model.clone();
                }
            }
        }
        self.store = store;
        self.active = None;
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.active.as_deref().and_then(|id| self.store.get(id))
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    /// Look up a chat, failing with [`ParlorError::ChatNotFound`]
    pub fn chat(&self, id: &str) -> Result<&Chat> {
        self.store
            .get(id)
            .ok_or_else(|| ParlorError::ChatNotFound(id.to_string()).into())
    }

    fn chat_mut(&mut self, id: &str) -> Result<&mut Chat> {
        self.store
            .get_mut(id)
            .ok_or_else(|| ParlorError::ChatNotFound(id.to_string()).into())
    }

    /// Create a chat, insert it and make it active
    ///
    /// # Returns
    ///
    /// A copy of the new chat, ready to be persisted
    pub fn create_chat(&mut self, model: &str, now: DateTime<Utc>) -> Chat {
        let id = self.store.next_id(now);
        let chat = Chat::new(id.clone(), model, now);
        self.store.insert(chat.clone());
        self.active = Some(id);
        chat
    }

    /// Rename a chat; a title that is blank after trimming becomes the default
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::ChatNotFound`] for an unknown id
    pub fn rename_chat(&mut self, id: &str, new_title: &str) -> Result<Chat> {
        let trimmed = new_title.trim();
        let chat = self.chat_mut(id)?;
        chat.title = if trimmed.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            trimmed.to_string()
        };
        Ok(chat.clone())
    }

    /// Make `id` the active chat and select its model
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::ChatNotFound`] for an unknown id
    pub fn switch_chat(&mut self, id: &str) -> Result<&Chat> {
        let model = self.chat(id)?.model.clone();
        self.active = Some(id.to_string());
        self.selected_model = model;
        self.chat(id)
    }

    /// Select a model, updating the active chat if there is one
    ///
    /// # Returns
    ///
    /// The active chat after the change, if any, so it can be persisted
    pub fn set_model(&mut self, model: &str) -> Option<Chat> {
        self.selected_model = model.to_string();
        let id = self.active.clone()?;
        let chat = self.store.get_mut(&id)?;
        chat.model = model.to_string();
        Some(chat.clone())
    }

    /// Append a message to a chat
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::ChatNotFound`] when the chat no longer exists
    pub fn append_message(&mut self, id: &str, message: Message) -> Result<&Chat> {
        let chat = self.chat_mut(id)?;
        chat.messages.push(message);
        Ok(chat)
    }

    /// Remove the last message of a chat if it equals `expected`
    ///
    /// Returns whether a message was removed.
    pub fn pop_message_if_last(&mut self, id: &str, expected: &Message) -> bool {
        match self.store.get_mut(id) {
            Some(chat) if chat.messages.last() == Some(expected) => {
                chat.messages.pop();
                true
            }
            _ => false,
        }
    }

    /// Replace a default title with one derived from the first message
    ///
    /// Applies only when the title is still the default and the chat holds at
    /// least two messages. Returns the updated chat when the title changed.
    pub fn derive_title(&mut self, id: &str, prefix_chars: usize) -> Option<Chat> {
        let chat = self.store.get_mut(id)?;
        if !chat.has_default_title() || chat.messages.len() < 2 {
            return None;
        }
        chat.title = chat.derived_title(prefix_chars)?;
        Some(chat.clone())
    }

    /// Remove a chat after the backend confirmed its deletion
    ///
    /// If the removed chat was active the pointer is cleared and the most
    /// recent remaining chat, if any, becomes active.
    ///
    /// # Returns
    ///
    /// The id of the newly active chat when a successor was selected
    pub fn remove_chat(&mut self, id: &str) -> Option<ChatId> {
        self.store.remove(id)?;
        if self.active.as_deref() != Some(id) {
            return None;
        }
        self.active = None;
        let next = self.store.most_recent()?;
        // switch_chat cannot fail here since the id came from the store
        self.switch_chat(&next).ok()?;
        Some(next)
    }
}
