//! Controllers driving the chat session
//!
//! - `conversation`: chat lifecycle operations and the send/receive round trip
//! - `chat_list`: ordered chat list, selection and inline rename
//! - `bootstrap`: initial load from the backend
//!
//! All controllers share one [`SharedState`]. Locks are taken in short
//! synchronous sections and never held across an `.await`.

pub mod bootstrap;
pub mod chat_list;
pub mod conversation;

pub use bootstrap::{start_session, BootstrapReport};
pub use chat_list::{ChatListController, ChatListEntry};
pub use conversation::{
    ControllerOptions, ConversationController, DeleteOutcome, PendingSend, SendOutcome, SendState,
};

use crate::chat::SessionState;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Session state shared between controllers and spawned send tasks
pub type SharedState = Arc<RwLock<SessionState>>;

// Poisoned locks are recovered: no critical section can panic halfway
// through an update.
pub(crate) fn read_state(state: &SharedState) -> RwLockReadGuard<'_, SessionState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_state(state: &SharedState) -> RwLockWriteGuard<'_, SessionState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}
