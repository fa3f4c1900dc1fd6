//! In-memory chat collection
//!
//! The store maps chat ids to chats. Display order is computed on demand:
//! newest `created_at` first, ties broken by id (descending) so the order is
//! deterministic regardless of map iteration order.

use crate::chat::types::{Chat, ChatId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// In-memory mapping from chat id to chat
#[derive(Debug, Default, Clone)]
pub struct ChatStore {
    chats: HashMap<ChatId, Chat>,
    last_issued: u64,
}

impl ChatStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a backend listing
    ///
    /// Entries with an empty id are skipped; an entry whose `id` field disagrees
    /// with its map key takes the key as its id.
    pub fn from_listing(listing: HashMap<ChatId, Chat>) -> Self {
        let mut store = Self::new();
        for (key, mut chat) in listing {
            if key.is_empty() {
                tracing::warn!("Skipping chat with empty id from backend listing");
                continue;
            }
            if chat.id != key {
                tracing::debug!("Chat key {} disagrees with id {}; using key", key, chat.id);
                chat.id = key;
            }
            store.insert(chat);
        }
        store
    }

    /// Issue a fresh id derived from `now`
    ///
    /// The id is the millisecond timestamp, bumped past the last issued value
    /// and past any numeric key already present, so it never collides.
    pub fn next_id(&mut self, now: DateTime<Utc>) -> ChatId {
        let mut candidate = now.timestamp_millis().max(0) as u64;
        if candidate <= self.last_issued {
            candidate = self.last_issued + 1;
        }
        while self.chats.contains_key(&candidate.to_string()) {
            candidate += 1;
        }
        self.last_issued = candidate;
        candidate.to_string()
    }

    /// Insert or replace a chat
    pub fn insert(&mut self, chat: Chat) -> Option<Chat> {
        self.chats.insert(chat.id.clone(), chat)
    }

    /// Remove a chat
    pub fn remove(&mut self, id: &str) -> Option<Chat> {
        self.chats.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Chat> {
        self.chats.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Chat> {
        self.chats.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.chats.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Chats in display order (newest first)
    pub fn sorted(&self) -> Vec<&Chat> {
        let mut chats: Vec<&Chat> = self.chats.values().collect();
        chats.sort_by(|a, b| {
            b.created_at_utc()
                .cmp(&a.created_at_utc())
                .then_with(|| b.id.cmp(&a.id))
        });
        chats
    }

    /// Id of the chat listed first in display order
    pub fn most_recent(&self) -> Option<ChatId> {
        self.sorted().first().map(|chat| chat.id.clone())
    }
}
