//! Chat and message types shared by the store, controllers and backend

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Title given to new chats and to chats renamed to blank text
pub const DEFAULT_TITLE: &str = "New Chat";

/// Suffix appended to titles derived from the first message
pub const TITLE_ELLIPSIS: &str = "...";

/// Unique chat identifier
pub type ChatId = String;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person at the terminal
    User,
    /// Returned by the completion backend
    Assistant,
}

impl Role {
    /// Human-readable label shown in message headers
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "AI",
        }
    }

    /// Whether this is the assistant role
    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a chat
///
/// # Examples
///
/// ```
/// use parlor::chat::{Message, Role};
///
/// let msg = Message::user("Hello!");
/// assert_eq!(msg.role, Role::User);
/// assert!(msg.to_html().contains("Hello!"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub role: Role,
    /// Raw, untrusted text
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl Message {
    /// Creates a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Render this message through the formatter
    pub fn to_html(&self) -> String {
        crate::formatter::format(&self.content, self.role.is_assistant())
    }
}

/// One conversation, in the same shape the backend stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier (creation timestamp in milliseconds)
    pub id: ChatId,
    /// Display title
    #[serde(default = "default_title", deserialize_with = "null_as_title")]
    pub title: String,
    /// Backend model used for completions; empty when the backend had none
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    /// Messages in creation order
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    /// Creation timestamp as returned by (or sent to) the backend
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

impl Chat {
    /// Create an empty chat with the default title
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use parlor::chat::{Chat, DEFAULT_TITLE};
    ///
    /// let chat = Chat::new("1700000000000", "gpt-4o", Utc::now());
    /// assert_eq!(chat.title, DEFAULT_TITLE);
    /// assert!(chat.messages.is_empty());
    /// ```
    pub fn new(id: impl Into<ChatId>, model: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            model: model.into(),
            messages: Vec::new(),
            created_at: created_at.to_rfc3339(),
        }
    }

    /// Whether the title is still the default
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// Creation time used for ordering
    ///
    /// Accepts RFC 3339, RFC 2822 (the HTTP date format some backends emit
    /// for timestamps) and naive ISO-8601 date-times read as UTC. Anything
    /// else sorts as the Unix epoch.
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        parse_timestamp(&self.created_at).unwrap_or_default()
    }

    /// Title derived from the first message, if one exists
    ///
    /// Takes the first `prefix_chars` characters and appends [`TITLE_ELLIPSIS`].
    pub fn derived_title(&self, prefix_chars: usize) -> Option<String> {
        self.messages.first().map(|first| {
            let prefix: String = first.content.chars().take(prefix_chars).collect();
            format!("{prefix}{TITLE_ELLIPSIS}")
        })
    }
}

/// Parse a backend timestamp in any of the accepted formats
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_title<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_title))
}
