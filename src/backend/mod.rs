//! Backend client for Parlor
//!
//! This module defines the [`ChatBackend`] trait that the controllers talk
//! to, along with the HTTP implementation used in production and an
//! in-memory fake used by tests.

pub mod fake;
pub mod http;

pub use fake::{BackendCall, FakeBackend};
pub use http::HttpBackend;

use crate::chat::{Chat, ChatId, Message};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Contract between the client and the chat backend
///
/// Every call is a single request with no retries. A non-success status is
/// reported as an error; see [`crate::error::ParlorError::BackendStatus`].
///
/// # Examples
///
/// ```no_run
/// use parlor::backend::{ChatBackend, HttpBackend};
/// use parlor::config::BackendConfig;
///
/// # async fn example() -> parlor::error::Result<()> {
/// let backend = HttpBackend::new(&BackendConfig::default())?;
/// let chats = backend.list_chats().await?;
/// println!("{} chats", chats.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Fetch every chat of the current session
    ///
    /// # Returns
    ///
    /// A mapping from chat id to chat; a missing collection is empty
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success status
    async fn list_chats(&self) -> Result<HashMap<ChatId, Chat>>;

    /// Persist a chat, replacing any previous version
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success status
    async fn save_chat(&self, chat: &Chat) -> Result<()>;

    /// Delete a chat
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success status
    async fn delete_chat(&self, id: &str) -> Result<()>;

    /// Ask the completion endpoint for a reply
    ///
    /// # Arguments
    ///
    /// * `model` - Model identifier of the chat
    /// * `messages` - The full message history, oldest first
    ///
    /// # Returns
    ///
    /// `Some(text)` for a non-empty reply, `None` when the body carried no
    /// usable `response`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, timeout or a non-success status
    async fn send_message(&self, model: &str, messages: &[Message]) -> Result<Option<String>>;

    /// Establish a session with the backend
    ///
    /// # Default Implementation
    ///
    /// Backends without authentication accept any credentials.
    async fn login(&self, _username: &str, _password: &str) -> Result<()> {
        Ok(())
    }

    /// End the backend session
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    async fn logout(&self) -> Result<()> {
        Ok(())
    }
}
