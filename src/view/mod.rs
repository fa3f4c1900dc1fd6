//! Rendering seam between the controllers and the terminal
//!
//! Controllers never print directly. They go through [`ChatView`], which the
//! chat loop implements with [`TerminalView`] and tests implement with
//! [`RecordingView`].

pub mod recording;
pub mod terminal;
pub mod transcript;

pub use recording::{RecordingView, ViewEvent};
pub use terminal::TerminalView;
pub use transcript::{render_transcript, write_transcript};

use crate::chat::Chat;
use crate::controller::chat_list::ChatListEntry;

/// Output surface used by the controllers
///
/// Implementations must be cheap to call from any task; controllers call
/// them outside of any session lock.
pub trait ChatView: Send + Sync {
    /// Show the messages of `chat`
    ///
    /// Called with the full chat after every change; implementations may
    /// skip messages they already showed unless [`ChatView::clear_messages`]
    /// was called in between.
    fn render_messages(&self, chat: &Chat);

    /// Empty the message display
    fn clear_messages(&self);

    /// Show the chat list in display order
    fn render_chat_list(&self, entries: &[ChatListEntry]);

    /// Show which model new sends will use
    fn set_model_indicator(&self, model: &str);

    /// Tell the user an operation failed
    fn notify_error(&self, message: &str);

    /// Tell the user something without implying failure
    fn notify_info(&self, message: &str);

    /// Ask a yes/no question; `false` means the operation is abandoned
    fn confirm(&self, prompt: &str) -> bool;
}
