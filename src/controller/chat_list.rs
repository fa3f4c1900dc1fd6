//! Chat list controller
//!
//! Presents the chat store as a numbered list in display order and resolves
//! user selections (a 1-based position or a chat id) to chat ids. Inline
//! rename is modelled as an edit mode: [`ChatListController::begin_edit`]
//! marks one chat, and the next committed text becomes its title.

use crate::chat::{ChatId, SessionState};
use crate::controller::conversation::{ConversationController, DeleteOutcome};
use crate::controller::{read_state, SharedState};
use crate::error::{ParlorError, Result};
use crate::view::ChatView;
use std::sync::{Arc, Mutex, MutexGuard};

/// One row of the rendered chat list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListEntry {
    /// 1-based position in display order
    pub position: usize,
    pub id: ChatId,
    pub title: String,
    pub model: String,
    pub created_at: String,
    /// Whether this is the active chat
    pub active: bool,
    /// Whether this row is in edit mode
    pub editing: bool,
}

/// Build list rows for `state`, newest chat first
pub fn entries(state: &SessionState, editing: Option<&str>) -> Vec<ChatListEntry> {
    let active = state.active_id();
    state
        .store()
        .sorted()
        .into_iter()
        .enumerate()
        .map(|(index, chat)| ChatListEntry {
            position: index + 1,
            id: chat.id.clone(),
            title: chat.title.clone(),
            model: chat.model.clone(),
            created_at: chat.created_at.clone(),
            active: active == Some(chat.id.as_str()),
            editing: editing == Some(chat.id.as_str()),
        })
        .collect()
}

/// Resolve a selector to an existing chat id
///
/// A selector that parses as a number within the list length is a position;
/// anything else must be a chat id.
///
/// # Errors
///
/// Returns [`ParlorError::ChatNotFound`] when nothing matches
pub fn resolve(state: &SessionState, selector: &str) -> Result<ChatId> {
    let selector = selector.trim();
    let sorted = state.store().sorted();

    if let Ok(position) = selector.parse::<usize>() {
        if (1..=sorted.len()).contains(&position) {
            return Ok(sorted[position - 1].id.clone());
        }
    }
    if state.store().contains(selector) {
        return Ok(selector.to_string());
    }
    Err(ParlorError::ChatNotFound(selector.to_string()).into())
}

/// Renders the chat list and tracks edit mode
#[derive(Clone)]
pub struct ChatListController {
    state: SharedState,
    view: Arc<dyn ChatView>,
    editing: Arc<Mutex<Option<ChatId>>>,
}

impl ChatListController {
    pub fn new(state: SharedState, view: Arc<dyn ChatView>) -> Self {
        Self {
            state,
            view,
            editing: Arc::new(Mutex::new(None)),
        }
    }

    fn editing_slot(&self) -> MutexGuard<'_, Option<ChatId>> {
        self.editing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current rows, newest chat first
    pub fn entries(&self) -> Vec<ChatListEntry> {
        let editing = self.editing_slot().clone();
        entries(&read_state(&self.state), editing.as_deref())
    }

    /// Re-render the list through the view
    pub fn render(&self) {
        let rows = self.entries();
        self.view.render_chat_list(&rows);
    }

    /// Resolve a position or id against the current list
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::ChatNotFound`] when nothing matches
    pub fn resolve(&self, selector: &str) -> Result<ChatId> {
        resolve(&read_state(&self.state), selector)
    }

    /// Resolve `selector`, or fall back to the active chat when it is absent
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::NoActiveChat`] when no selector is given and no
    /// chat is active, or [`ParlorError::ChatNotFound`] for a bad selector
    pub fn resolve_or_active(&self, selector: Option<&str>) -> Result<ChatId> {
        match selector {
            Some(selector) => self.resolve(selector),
            None => read_state(&self.state)
                .active_id()
                .map(str::to_string)
                .ok_or_else(|| ParlorError::NoActiveChat.into()),
        }
    }

    /// Switch to the chat at `selector`
    ///
    /// # Errors
    ///
    /// Returns error if the selector matches no chat
    pub fn select(&self, conversation: &ConversationController, selector: &str) -> Result<ChatId> {
        let id = self.resolve(selector)?;
        conversation.switch_chat(&id)?;
        self.render();
        Ok(id)
    }

    /// Enter edit mode for a chat
    ///
    /// # Errors
    ///
    /// Returns error if the selector matches no chat
    pub fn begin_edit(&self, selector: Option<&str>) -> Result<ChatId> {
        let id = self.resolve_or_active(selector)?;
        *self.editing_slot() = Some(id.clone());
        self.render();
        Ok(id)
    }

    /// Id of the chat in edit mode, if any
    pub fn editing(&self) -> Option<ChatId> {
        self.editing_slot().clone()
    }

    /// Leave edit mode without renaming
    pub fn cancel_edit(&self) {
        if self.editing_slot().take().is_some() {
            self.render();
        }
    }

    /// Leave edit mode if it targets `id` (used when that chat disappears)
    pub(crate) fn forget(&self, id: &str) {
        let mut slot = self.editing_slot();
        if slot.as_deref() == Some(id) {
            *slot = None;
        }
    }

    /// Commit the edited title
    ///
    /// # Returns
    ///
    /// The renamed chat id, or `None` when edit mode was not active
    ///
    /// # Errors
    ///
    /// Returns error if the edited chat no longer exists
    pub fn commit_edit(
        &self,
        conversation: &ConversationController,
        title: &str,
    ) -> Result<Option<ChatId>> {
        let Some(id) = self.editing_slot().take() else {
            return Ok(None);
        };
        conversation.rename_chat(&id, title)?;
        Ok(Some(id))
    }

    /// Inline rename in one step: edit mode followed by commit
    ///
    /// # Errors
    ///
    /// Returns error if the selector matches no chat
    pub fn rename(
        &self,
        conversation: &ConversationController,
        selector: Option<&str>,
        title: &str,
    ) -> Result<ChatId> {
        let id = self.resolve_or_active(selector)?;
        *self.editing_slot() = Some(id.clone());
        self.commit_edit(conversation, title)?;
        Ok(id)
    }

    /// Delete the chat at `selector` (the active chat when absent)
    ///
    /// # Errors
    ///
    /// Returns error if the selector matches no chat
    pub async fn delete(
        &self,
        conversation: &ConversationController,
        selector: Option<&str>,
    ) -> Result<DeleteOutcome> {
        let id = self.resolve_or_active(selector)?;
        conversation.delete_chat(&id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Chat;
    use crate::chat::ChatStore;
    use chrono::{TimeZone, Utc};

    fn state_with(chats: &[(&str, i64)]) -> SessionState {
        let mut store = ChatStore::new();
        for (id, secs) in chats {
            store.insert(Chat::new(*id, "m", Utc.timestamp_opt(*secs, 0).unwrap()));
        }
        let mut state = SessionState::new("m");
        state.populate(store);
        state
    }

    #[test]
    fn test_entries_newest_first() {
        let mut state = state_with(&[("A", 100), ("B", 200)]);
        state.switch_chat("A").unwrap();

        let rows = entries(&state, Some("B"));
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(rows[0].position, 1);
        assert!(rows[0].editing && !rows[0].active);
        assert!(rows[1].active && !rows[1].editing);
    }

    #[test]
    fn test_resolve_by_position_and_id() {
        let state = state_with(&[("A", 100), ("B", 200)]);
        assert_eq!(resolve(&state, "1").unwrap(), "B");
        assert_eq!(resolve(&state, " 2 ").unwrap(), "A");
        assert_eq!(resolve(&state, "A").unwrap(), "A");
    }

    #[test]
    fn test_resolve_numeric_id_outside_positions() {
        let state = state_with(&[("1700000000000", 100)]);
        assert_eq!(resolve(&state, "1700000000000").unwrap(), "1700000000000");
    }

    #[test]
    fn test_resolve_unknown() {
        let state = state_with(&[("A", 100)]);
        assert!(resolve(&state, "3").is_err());
        assert!(resolve(&state, "Z").is_err());
        assert!(resolve(&state, "0").is_err());
    }
}
