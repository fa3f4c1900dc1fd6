//! Standalone HTML transcripts of a chat

use crate::chat::Chat;
use crate::error::Result;
use anyhow::Context;
use std::path::Path;

/// Render every message of `chat`, in order, as one HTML document
///
/// The title receives the same `<`/`>` escaping as message content.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use parlor::chat::{Chat, Message};
/// use parlor::view::render_transcript;
///
/// let mut chat = Chat::new("1", "gpt-4o", Utc::now());
/// chat.title = "<Plans>".to_string();
/// chat.messages.push(Message::user("hi"));
/// chat.messages.push(Message::assistant("hello"));
///
/// let html = render_transcript(&chat);
/// assert!(html.contains("<title>&lt;Plans&gt;</title>"));
/// assert!(html.find("data-role=\"user\"") < html.find("data-role=\"assistant\""));
/// ```
pub fn render_transcript(chat: &Chat) -> String {
    let body: String = chat.messages.iter().map(|m| m.to_html()).collect();
    document(&chat.title, &chat.model, &body)
}

/// A transcript document with no messages
pub fn empty_transcript() -> String {
    document("Parlor", "", "")
}

fn document(title: &str, model: &str, body: &str) -> String {
    let title = escape(title);
    let model = escape(model);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         </head>\n\
         <body>\n\
         <div class=\"chat\" data-model=\"{model}\">\n\
         {body}\
         </div>\n\
         </body>\n\
         </html>\n"
    )
}

fn escape(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// Write the transcript of `chat` (or an empty one) to `path`
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn write_transcript(path: &Path, chat: Option<&Chat>) -> Result<()> {
    let html = chat.map(render_transcript).unwrap_or_else(empty_transcript);
    std::fs::write(path, html)
        .with_context(|| format!("Failed to write transcript {}", path.display()))?;
    Ok(())
}
