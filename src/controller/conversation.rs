//! Conversation controller
//!
//! Owns the chat lifecycle operations (create, rename, switch, delete, model
//! change) and the send/receive round trip. Persistence goes through a
//! background queue so callers never wait on `save_chat`. Saves and deletes
//! run one at a time in the order they were queued.
//!
//! # Send round trip
//!
//! A send moves through `Idle -> Sending -> {Completed, Failed}`, or
//! `Cancelled` when its chat is deleted while the request is in flight:
//!
//! 1. [`ConversationController::begin_send`] checks the preconditions,
//!    appends the user message to the active chat and renders it.
//! 2. [`PendingSend::complete`] calls the backend and applies the reply to
//!    the chat captured in step 1, whichever chat is active by then.
//!
//! [`ConversationController::send_message`] runs both steps inline and
//! [`ConversationController::spawn_send`] runs step 2 as a tracked task.

use crate::backend::ChatBackend;
use crate::chat::{Chat, ChatId, Message, SessionState};
use crate::config::{ChatConfig, UnansweredPolicy};
use crate::controller::chat_list::ChatListController;
use crate::controller::{read_state, write_state, SharedState};
use crate::error::{ParlorError, Result};
use crate::metrics::{record_save_failure, SendMetrics};
use crate::view::ChatView;

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Notification shown when a send fails
pub const SEND_FAILED_MESSAGE: &str = "An error occurred while sending the message";

/// Notification shown when the backend refuses a delete
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete chat";

/// Question asked before deleting a chat
pub const DELETE_CONFIRM_PROMPT: &str = "Are you sure you want to delete this chat?";

/// Behavior switches for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Characters of the first message kept in a derived title
    pub title_prefix_chars: usize,
    /// What happens to the user message when a send fails
    pub on_send_failure: UnansweredPolicy,
    /// Ask before deleting
    pub confirm_delete: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

impl From<&ChatConfig> for ControllerOptions {
    fn from(config: &ChatConfig) -> Self {
        Self {
            title_prefix_chars: config.title_prefix_chars,
            on_send_failure: config.on_send_failure,
            confirm_delete: config.confirm_delete,
        }
    }
}

/// State of a send operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
    Completed,
    Failed,
    Cancelled,
}

/// How a send ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Preconditions not met; nothing changed
    Skipped,
    /// Reply appended to the chat
    Completed { chat_id: ChatId, reply: String },
    /// Backend answered without a usable reply; nothing appended
    NoResponse { chat_id: ChatId },
    /// Transport failure, timeout or non-success status
    Failed { chat_id: ChatId, error: String },
    /// The request was cancelled before it finished
    Cancelled { chat_id: ChatId },
    /// A reply arrived for a chat that no longer exists
    Dropped { chat_id: ChatId },
}

impl SendOutcome {
    /// Final state of the send
    pub fn state(&self) -> SendState {
        match self {
            Self::Skipped => SendState::Idle,
            Self::Completed { .. } | Self::NoResponse { .. } => SendState::Completed,
            Self::Failed { .. } => SendState::Failed,
            Self::Cancelled { .. } | Self::Dropped { .. } => SendState::Cancelled,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Completed { .. } => "completed",
            Self::NoResponse { .. } => "no_response",
            Self::Failed { .. } => "failed",
            Self::Cancelled { .. } => "cancelled",
            Self::Dropped { .. } => "dropped",
        }
    }
}

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed; `next` is the chat switched to, if any
    Deleted { next: Option<ChatId> },
    /// The user declined the confirmation
    Declined,
    /// The backend refused; the store is unchanged
    Failed { error: String },
}

/// Local effect of a confirmed delete
struct Removal {
    was_active: bool,
    next: Option<ChatId>,
    now_empty: bool,
}

enum PersistJob {
    /// Save the chat as it is when the job runs
    Save(ChatId),
    Delete {
        id: ChatId,
        done: oneshot::Sender<Result<Removal>>,
    },
    Flush(oneshot::Sender<()>),
}

fn queue_closed() -> anyhow::Error {
    ParlorError::Backend("Persistence queue closed".to_string()).into()
}

/// Start the worker that performs queued persistence calls in order
///
/// Saves copy the chat from the session when the job runs, so the last save
/// queued after a mutation always writes that mutation. A confirmed delete
/// removes the chat from the session before the next job runs, and saves of
/// chats no longer in the session are skipped, so a deleted chat is never
/// written back. Save failures are logged and counted; they are never
/// surfaced to the user.
fn start_persist_worker(
    state: SharedState,
    backend: Arc<dyn ChatBackend>,
    mut jobs: mpsc::UnboundedReceiver<PersistJob>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            match job {
                PersistJob::Save(id) => {
                    let current = read_state(&state).chat(&id).ok().cloned();
                    let Some(chat) = current else {
                        tracing::debug!("Skipping save of deleted chat {}", id);
                        continue;
                    };
                    if let Err(e) = backend.save_chat(&chat).await {
                        tracing::error!("Failed to save chat {}: {:#}", chat.id, e);
                        record_save_failure();
                    }
                }
                PersistJob::Delete { id, done } => {
                    let result = backend.delete_chat(&id).await.map(|()| {
                        let mut state = write_state(&state);
                        let was_active = state.active_id() == Some(id.as_str());
                        let next = state.remove_chat(&id);
                        Removal {
                            was_active,
                            next,
                            now_empty: state.store().is_empty(),
                        }
                    });
                    let _ = done.send(result);
                }
                PersistJob::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!("Persistence queue closed");
    })
}

/// Drives the chat lifecycle and the send/receive round trip
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct ConversationController {
    state: SharedState,
    backend: Arc<dyn ChatBackend>,
    view: Arc<dyn ChatView>,
    chat_list: ChatListController,
    options: ControllerOptions,
    jobs: mpsc::UnboundedSender<PersistJob>,
    inflight: Arc<Mutex<HashMap<ChatId, CancellationToken>>>,
    sends: TaskTracker,
}

impl ConversationController {
    /// Create a controller over `state`
    ///
    /// Must be called from within a Tokio runtime; the persistence worker is
    /// spawned here.
    pub fn new(
        state: SessionState,
        backend: Arc<dyn ChatBackend>,
        view: Arc<dyn ChatView>,
        options: ControllerOptions,
    ) -> Self {
        let state: SharedState = Arc::new(RwLock::new(state));
        let (jobs, queue) = mpsc::unbounded_channel();
        start_persist_worker(Arc::clone(&state), Arc::clone(&backend), queue);

        Self {
            chat_list: ChatListController::new(Arc::clone(&state), Arc::clone(&view)),
            state,
            backend,
            view,
            options,
            jobs,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            sends: TaskTracker::new(),
        }
    }

    pub fn chat_list(&self) -> &ChatListController {
        &self.chat_list
    }

    pub fn view(&self) -> &Arc<dyn ChatView> {
        &self.view
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    /// Run `f` with read access to the session
    pub fn with_state<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&read_state(&self.state))
    }

    /// Copy of the whole session
    pub fn snapshot(&self) -> SessionState {
        read_state(&self.state).clone()
    }

    pub fn active_chat(&self) -> Option<Chat> {
        read_state(&self.state).active_chat().cloned()
    }

    pub fn selected_model(&self) -> String {
        read_state(&self.state).selected_model().to_string()
    }

    fn inflight(&self) -> MutexGuard<'_, HashMap<ChatId, CancellationToken>> {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a background save of chat `id`
    fn persist(&self, id: &str) {
        tracing::debug!("Queueing save for chat {}", id);
        if self.jobs.send(PersistJob::Save(id.to_string())).is_err() {
            tracing::error!("Persistence queue is closed; chat not persisted");
            record_save_failure();
        }
    }

    /// Wait until every save queued so far has finished
    pub async fn flush_pending(&self) {
        let (done, finished) = oneshot::channel();
        if self.jobs.send(PersistJob::Flush(done)).is_err() {
            return;
        }
        let _ = finished.await;
    }

    /// Number of sends currently in flight through [`Self::spawn_send`]
    pub fn sends_in_flight(&self) -> usize {
        self.sends.len()
    }

    /// Cancel every in-flight send, wait for the send tasks, then flush saves
    pub async fn shutdown(&self) {
        for token in self.inflight().values() {
            token.cancel();
        }
        self.sends.close();
        self.sends.wait().await;
        self.flush_pending().await;
        tracing::debug!("Conversation controller shut down");
    }

    /// Render the active chat from scratch, or clear the display
    fn show_active(&self) {
        let active = self.active_chat();
        self.view.clear_messages();
        if let Some(chat) = active {
            self.view.set_model_indicator(&chat.model);
            self.view.render_messages(&chat);
        }
    }

    /// Create a chat with the selected model and make it active
    ///
    /// The save runs in the background.
    ///
    /// # Returns
    ///
    /// The id of the new chat
    pub fn create_chat(&self) -> ChatId {
        let chat = {
            let mut state = write_state(&self.state);
            let model = state.selected_model().to_string();
            state.create_chat(&model, Utc::now())
        };
        tracing::info!("Created chat {} (model={})", chat.id, chat.model);

        self.view.clear_messages();
        self.chat_list.render();
        self.persist(&chat.id);
        chat.id
    }

    /// Rename a chat; blank titles become the default title
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::ChatNotFound`] for an unknown id
    pub fn rename_chat(&self, id: &str, title: &str) -> Result<Chat> {
        let chat = write_state(&self.state).rename_chat(id, title)?;
        tracing::info!("Renamed chat {} to {:?}", chat.id, chat.title);

        self.persist(&chat.id);
        self.chat_list.render();
        Ok(chat)
    }

    /// Make `id` the active chat and render it from scratch
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::ChatNotFound`] for an unknown id
    pub fn switch_chat(&self, id: &str) -> Result<()> {
        write_state(&self.state).switch_chat(id)?;
        tracing::debug!("Switched to chat {}", id);
        self.show_active();
        Ok(())
    }

    /// Select a model; the active chat, if any, switches to it and is saved
    ///
    /// Blank model names are ignored.
    ///
    /// # Returns
    ///
    /// Whether the model changed
    pub fn change_model(&self, model: &str) -> bool {
        let model = model.trim();
        if model.is_empty() {
            return false;
        }

        let updated = write_state(&self.state).set_model(model);
        tracing::info!("Selected model {}", model);
        self.view.set_model_indicator(model);
        if let Some(chat) = updated {
            self.persist(&chat.id);
        }
        true
    }

    /// Delete a chat after confirmation
    ///
    /// The delete is queued behind pending saves and the chat is removed
    /// only after the backend confirms. Pending sends for it are cancelled.
    /// If it was active, the most recent remaining chat becomes active.
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::ChatNotFound`] for an unknown id. Backend
    /// failures are reported as [`DeleteOutcome::Failed`].
    pub async fn delete_chat(&self, id: &str) -> Result<DeleteOutcome> {
        if !read_state(&self.state).store().contains(id) {
            return Err(ParlorError::ChatNotFound(id.to_string()).into());
        }

        if self.options.confirm_delete && !self.view.confirm(DELETE_CONFIRM_PROMPT) {
            tracing::debug!("Delete of chat {} declined", id);
            return Ok(DeleteOutcome::Declined);
        }

        let (done, removed) = oneshot::channel();
        let job = PersistJob::Delete {
            id: id.to_string(),
            done,
        };
        let removal = match self.jobs.send(job) {
            Ok(()) => removed.await.unwrap_or_else(|_| Err(queue_closed())),
            Err(_) => Err(queue_closed()),
        };
        let Removal {
            was_active,
            next,
            now_empty,
        } = match removal {
            Ok(removal) => removal,
            Err(e) => {
                tracing::error!("Failed to delete chat {}: {:#}", id, e);
                self.view.notify_error(DELETE_FAILED_MESSAGE);
                return Ok(DeleteOutcome::Failed {
                    error: format!("{:#}", e),
                });
            }
        };

        if let Some(token) = self.inflight().remove(id) {
            tracing::debug!("Cancelling in-flight sends for chat {}", id);
            token.cancel();
        }
        self.chat_list.forget(id);
        tracing::info!("Deleted chat {}", id);

        if next.is_some() {
            self.show_active();
        } else if was_active || now_empty {
            self.view.clear_messages();
        }
        self.chat_list.render();

        Ok(DeleteOutcome::Deleted { next })
    }

    /// Append the user message and prepare the backend call
    ///
    /// # Returns
    ///
    /// `None` when the trimmed input is empty or no chat is active; in that
    /// case the store is untouched and nothing is sent
    pub fn begin_send(&self, input: &str) -> Option<PendingSend> {
        let text = input.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring empty message");
            return None;
        }

        let sent = Message::user(text);
        let chat = {
            let mut state = write_state(&self.state);
            let id = state.active_id()?.to_string();
            state.append_message(&id, sent.clone()).ok()?.clone()
        };
        self.view.render_messages(&chat);

        let token = self
            .inflight()
            .entry(chat.id.clone())
            .or_default()
            .child_token();

        tracing::debug!(
            "Sending message in chat {} ({} messages, model={})",
            chat.id,
            chat.messages.len(),
            chat.model
        );

        Some(PendingSend {
            controller: self.clone(),
            metrics: SendMetrics::new(&chat.model),
            chat_id: chat.id,
            model: chat.model,
            messages: chat.messages,
            sent,
            token,
        })
    }

    /// Send `input` in the active chat and wait for the reply
    pub async fn send_message(&self, input: &str) -> SendOutcome {
        match self.begin_send(input) {
            Some(pending) => pending.complete().await,
            None => SendOutcome::Skipped,
        }
    }

    /// Send `input` in the active chat without waiting for the reply
    ///
    /// The user message is appended before this returns. The round trip runs
    /// as a task tracked for [`Self::shutdown`].
    ///
    /// # Returns
    ///
    /// A handle to the send task, or `None` when nothing was sent
    pub fn spawn_send(&self, input: &str) -> Option<JoinHandle<SendOutcome>> {
        let pending = self.begin_send(input)?;
        Some(self.sends.spawn(pending.complete()))
    }

    fn apply_failure_policy(&self, chat_id: &str, sent: &Message) {
        if self.options.on_send_failure != UnansweredPolicy::Rollback {
            return;
        }

        let rolled_back = {
            let mut state = write_state(&self.state);
            state
                .pop_message_if_last(chat_id, sent)
                .then(|| state.active_id() == Some(chat_id))
        };
        if let Some(is_active) = rolled_back {
            tracing::debug!("Rolled back unanswered message in chat {}", chat_id);
            if is_active {
                self.show_active();
            }
        }
    }

    fn apply_reply(&self, chat_id: &str, reply: &str) -> SendOutcome {
        let appended = {
            let mut state = write_state(&self.state);
            let is_active = state.active_id() == Some(chat_id);
            state
                .append_message(chat_id, Message::assistant(reply))
                .map(|chat| (chat.clone(), is_active))
        };

        let (chat, is_active) = match appended {
            Ok(appended) => appended,
            Err(_) => {
                tracing::info!("Dropping reply for deleted chat {}", chat_id);
                return SendOutcome::Dropped {
                    chat_id: chat_id.to_string(),
                };
            }
        };

        if is_active {
            self.view.render_messages(&chat);
        }
        self.persist(&chat.id);

        let titled = write_state(&self.state).derive_title(chat_id, self.options.title_prefix_chars);
        if let Some(chat) = titled {
            tracing::debug!("Derived title {:?} for chat {}", chat.title, chat.id);
            self.persist(&chat.id);
            self.chat_list.render();
        }

        SendOutcome::Completed {
            chat_id: chat_id.to_string(),
            reply: reply.to_string(),
        }
    }
}

/// A send whose user message is already appended
///
/// Dropping it without calling [`PendingSend::complete`] leaves the chat
/// "sent but unanswered".
pub struct PendingSend {
    controller: ConversationController,
    chat_id: ChatId,
    model: String,
    messages: Vec<Message>,
    sent: Message,
    token: CancellationToken,
    metrics: SendMetrics,
}

impl PendingSend {
    /// Id of the chat the reply will be applied to
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Cancel this send
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Call the backend and apply the result to the captured chat
    pub async fn complete(self) -> SendOutcome {
        let controller = &self.controller;
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            result = controller.backend.send_message(&self.model, &self.messages) => Some(result),
        };

        let outcome = match result {
            None => {
                tracing::info!("Send cancelled for chat {}", self.chat_id);
                controller.apply_failure_policy(&self.chat_id, &self.sent);
                SendOutcome::Cancelled {
                    chat_id: self.chat_id.clone(),
                }
            }
            Some(Err(e)) => {
                tracing::error!("Send failed for chat {}: {:#}", self.chat_id, e);
                controller.view.notify_error(SEND_FAILED_MESSAGE);
                controller.apply_failure_policy(&self.chat_id, &self.sent);
                SendOutcome::Failed {
                    chat_id: self.chat_id.clone(),
                    error: format!("{:#}", e),
                }
            }
            Some(Ok(None)) => {
                tracing::warn!(
                    "Backend returned no response for chat {}; nothing appended",
                    self.chat_id
                );
                SendOutcome::NoResponse {
                    chat_id: self.chat_id.clone(),
                }
            }
            Some(Ok(Some(reply))) => controller.apply_reply(&self.chat_id, &reply),
        };

        self.metrics.record_outcome(outcome.label());
        tracing::debug!(
            "Send for chat {} finished as {} after {:.2}s",
            self.chat_id,
            outcome.label(),
            self.metrics.elapsed_secs()
        );
        outcome
    }
}
