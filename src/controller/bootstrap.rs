//! Session bootstrap
//!
//! Loads the chat collection from the backend, builds the [`SessionState`]
//! and hands it to a new [`ConversationController`]. A failed fetch never
//! aborts the session; it continues with an empty store.

use crate::backend::ChatBackend;
use crate::chat::{ChatId, ChatStore, SessionState};
use crate::controller::conversation::{ControllerOptions, ConversationController};
use crate::view::ChatView;
use std::sync::Arc;

/// Notification shown when the initial fetch fails
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load chats";

/// What bootstrap found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Number of chats loaded
    pub chats: usize,
    /// The chat made active, if any
    pub selected: Option<ChatId>,
    /// Fetch error, when the store started empty because of it
    pub error: Option<String>,
}

/// Fetch the chats and start a session over them
///
/// The most recently created chat becomes active. The chat list is rendered
/// and, when a chat was selected, its messages too.
///
/// # Arguments
///
/// * `backend` - Backend to load from and to use for the session
/// * `view` - View receiving the initial render
/// * `options` - Controller behavior
/// * `default_model` - Model selected before any chat is active
///
/// # Returns
///
/// The controller and a report of what was loaded
///
/// # Examples
///
/// ```no_run
/// use parlor::backend::FakeBackend;
/// use parlor::controller::{start_session, ControllerOptions};
/// use parlor::view::RecordingView;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let (controller, report) = start_session(
///     Arc::new(FakeBackend::new()),
///     Arc::new(RecordingView::new()),
///     ControllerOptions::default(),
///     "gpt-3.5-turbo",
/// )
/// .await;
/// assert_eq!(report.chats, 0);
/// assert!(controller.active_chat().is_none());
/// # }
/// ```
pub async fn start_session(
    backend: Arc<dyn ChatBackend>,
    view: Arc<dyn ChatView>,
    options: ControllerOptions,
    default_model: &str,
) -> (ConversationController, BootstrapReport) {
    let mut report = BootstrapReport::default();
    let mut state = SessionState::new(default_model);

    match backend.list_chats().await {
        Ok(listing) => {
            let store = ChatStore::from_listing(listing);
            report.chats = store.len();
            report.selected = store.most_recent();
            state.populate(store);
            tracing::info!("Loaded {} chats", report.chats);
        }
        Err(e) => {
            tracing::error!("Failed to load chats: {:#}", e);
            view.notify_error(LOAD_FAILED_MESSAGE);
            report.error = Some(format!("{:#}", e));
        }
    }

    let controller = ConversationController::new(state, backend, view, options);

    match report.selected.as_deref() {
        Some(id) => {
            if let Err(e) = controller.switch_chat(id) {
                tracing::warn!("Could not select chat {}: {:#}", id, e);
                report.selected = None;
            }
        }
        None => controller
            .view()
            .set_model_indicator(&controller.selected_model()),
    }
    controller.chat_list().render();

    (controller, report)
}
