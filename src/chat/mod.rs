//! Chat data model and session state

pub mod session;
pub mod store;
pub mod types;

pub use session::SessionState;
pub use store::ChatStore;
pub use types::{parse_timestamp, Chat, ChatId, Message, Role, DEFAULT_TITLE, TITLE_ELLIPSIS};
