//! One-shot chat management commands
//!
//! `parlor chats list` prints the backend's chats as a table, newest first.
//! `parlor chats delete <id>` removes one after confirmation.

use crate::backend::ChatBackend;
use crate::chat::ChatStore;
use crate::cli::ChatsCommand;
use crate::config::Config;
use crate::controller::conversation::DELETE_CONFIRM_PROMPT;
use crate::error::{ParlorError, Result};
use crate::view::terminal::format_created_at;
use crate::view::{ChatView, TerminalView};
use colored::Colorize;
use prettytable::{format, Table};

/// Longest title shown in the table before it is shortened
const MAX_TITLE_CHARS: usize = 40;

/// Handle chat management commands
pub async fn handle_chats(config: &Config, command: ChatsCommand) -> Result<()> {
    let backend = super::connect(config).await?;

    match command {
        ChatsCommand::List => list_chats(backend.as_ref()).await,
        ChatsCommand::Delete { id, yes } => delete_chat(backend.as_ref(), &id, yes).await,
    }
}

fn shorten(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let kept: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", kept)
    } else {
        title.to_string()
    }
}

/// Print the stored chats as a table, newest first
pub async fn list_chats(backend: &dyn ChatBackend) -> Result<()> {
    let store = ChatStore::from_listing(backend.list_chats().await?);

    if store.is_empty() {
        println!("{}", "No chats found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "#".bold(),
        "ID".bold(),
        "Title".bold(),
        "Model".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for (index, chat) in store.sorted().into_iter().enumerate() {
        table.add_row(prettytable::row![
            index + 1,
            chat.id.cyan(),
            shorten(&chat.title),
            chat.model,
            chat.messages.len(),
            format_created_at(&chat.created_at)
        ]);
    }

    println!("\nChats:");
    table.printstd();
    println!();
    println!("Use {} to remove one.", "parlor chats delete <ID>".cyan());
    println!();

    Ok(())
}

/// Delete a stored chat by id
///
/// # Errors
///
/// Returns [`ParlorError::ChatNotFound`] if the backend has no such chat,
/// or the backend error if the delete is refused
pub async fn delete_chat(backend: &dyn ChatBackend, id: &str, yes: bool) -> Result<()> {
    let chats = backend.list_chats().await?;
    if !chats.contains_key(id) {
        return Err(ParlorError::ChatNotFound(id.to_string()).into());
    }

    if !yes && !TerminalView::new(None).confirm(DELETE_CONFIRM_PROMPT) {
        println!("{}", "Delete cancelled.".yellow());
        return Ok(());
    }

    backend.delete_chat(id).await?;
    println!("{}", format!("Deleted chat {}", id).green());
    Ok(())
}
