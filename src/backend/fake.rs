//! In-memory fake backend for controller unit and integration tests
//!
//! [`FakeBackend`] keeps chats in a map, records every call it receives and
//! can be told to fail individual operations. Replies to `send_message` are
//! scripted with [`FakeBackend::push_reply`]; without a script it echoes the
//! last message back.
//!
//! Sends can be held with [`FakeBackend::hold_sends`] so a test can act while
//! a request is in flight, then let them through with
//! [`FakeBackend::release_sends`].
//!
//! # Example
//!
//! ```
//! use parlor::backend::{BackendCall, ChatBackend, FakeBackend};
//! use parlor::chat::Message;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = FakeBackend::new();
//! backend.push_reply(Some("Hello back"));
//!
//! let reply = backend
//!     .send_message("gpt-4o", &[Message::user("Hello")])
//!     .await
//!     .unwrap();
//! assert_eq!(reply.as_deref(), Some("Hello back"));
//! assert_eq!(backend.send_count(), 1);
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::backend::ChatBackend;
use crate::chat::{Chat, ChatId, Message};
use crate::error::{ParlorError, Result};

/// One call observed by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListChats,
    SaveChat(Chat),
    DeleteChat(ChatId),
    SendMessage { model: String, messages: Vec<Message> },
    Login { username: String },
    Logout,
}

#[derive(Debug, Default)]
struct FakeState {
    chats: HashMap<ChatId, Chat>,
    calls: Vec<BackendCall>,
    replies: VecDeque<Option<String>>,
    credentials: Option<(String, String)>,
    fail_list: bool,
    fail_save: bool,
    fail_delete: bool,
    fail_send: bool,
}

/// In-memory [`ChatBackend`] for tests
#[derive(Debug, Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
    held: Arc<AtomicBool>,
    gate: Arc<Semaphore>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Create an empty fake that accepts any credentials
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            held: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Create a fake that already stores `chats`
    pub fn with_chats(chats: impl IntoIterator<Item = Chat>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock();
            for chat in chats {
                state.chats.insert(chat.id.clone(), chat);
            }
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: BackendCall) {
        self.lock().calls.push(call);
    }

    /// Only accept this username/password pair on login
    pub fn require_credentials(&self, username: &str, password: &str) {
        self.lock().credentials = Some((username.to_string(), password.to_string()));
    }

    /// Queue the next `send_message` reply (`None` means no usable response)
    pub fn push_reply(&self, reply: Option<&str>) {
        self.lock().replies.push_back(reply.map(str::to_string));
    }

    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn fail_save(&self, fail: bool) {
        self.lock().fail_save = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.lock().fail_delete = fail;
    }

    pub fn fail_send(&self, fail: bool) {
        self.lock().fail_send = fail;
    }

    /// Make every later `send_message` wait until released
    pub fn hold_sends(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let `count` held sends proceed
    pub fn release_sends(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// A chat as the fake currently stores it
    pub fn stored_chat(&self, id: &str) -> Option<Chat> {
        self.lock().chats.get(id).cloned()
    }

    pub fn stored_count(&self) -> usize {
        self.lock().chats.len()
    }

    pub fn send_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::SendMessage { .. }))
    }

    pub fn save_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::SaveChat(_)))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::DeleteChat(_)))
    }

    fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }
}

fn unavailable(operation: &str) -> anyhow::Error {
    ParlorError::BackendStatus {
        status: 500,
        message: format!("{} unavailable", operation),
    }
    .into()
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn list_chats(&self) -> Result<HashMap<ChatId, Chat>> {
        self.record(BackendCall::ListChats);
        let state = self.lock();
        if state.fail_list {
            return Err(unavailable("get_chats"));
        }
        Ok(state.chats.clone())
    }

    async fn save_chat(&self, chat: &Chat) -> Result<()> {
        self.record(BackendCall::SaveChat(chat.clone()));
        let mut state = self.lock();
        if state.fail_save {
            return Err(unavailable("save_chat"));
        }
        state.chats.insert(chat.id.clone(), chat.clone());
        Ok(())
    }

    async fn delete_chat(&self, id: &str) -> Result<()> {
        self.record(BackendCall::DeleteChat(id.to_string()));
        let mut state = self.lock();
        if state.fail_delete {
            return Err(unavailable("delete_chat"));
        }
        state.chats.remove(id);
        Ok(())
    }

    async fn send_message(&self, model: &str, messages: &[Message]) -> Result<Option<String>> {
        self.record(BackendCall::SendMessage {
            model: model.to_string(),
            messages: messages.to_vec(),
        });

        if self.held.load(Ordering::SeqCst) {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ParlorError::Backend(format!("Fake gate closed: {}", e)))?;
            permit.forget();
        }

        let mut state = self.lock();
        if state.fail_send {
            return Err(unavailable("send_message"));
        }
        let reply = match state.replies.pop_front() {
            Some(scripted) => scripted,
            None => messages
                .last()
                .map(|last| format!("Echo: {}", last.content)),
        };
        Ok(reply.filter(|text| !text.is_empty()))
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.record(BackendCall::Login {
            username: username.to_string(),
        });
        match &self.lock().credentials {
            Some((user, pass)) if user != username || pass != password => {
                Err(ParlorError::Authentication("Invalid credentials".to_string()).into())
            }
            _ => Ok(()),
        }
    }

    async fn logout(&self) -> Result<()> {
        self.record(BackendCall::Logout);
        Ok(())
    }
}
