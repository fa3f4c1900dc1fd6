//! Colored terminal rendering
//!
//! Messages are printed as plain text with a colored role label. Lines inside
//! fenced code blocks are highlighted. The view remembers how many messages
//! of the current chat it has printed so a reply only prints what is new.
//!
//! When a transcript path is configured, every render also rewrites that file
//! with the HTML transcript of the chat on screen.

use crate::chat::{parse_timestamp, Chat, ChatId, Message, Role};
use crate::controller::chat_list::ChatListEntry;
use crate::view::{transcript, ChatView};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// [`ChatView`] printing to stdout
#[derive(Debug, Default)]
pub struct TerminalView {
    shown: Mutex<Option<(ChatId, usize)>>,
    transcript_path: Option<PathBuf>,
}

impl TerminalView {
    pub fn new(transcript_path: Option<PathBuf>) -> Self {
        Self {
            shown: Mutex::new(None),
            transcript_path,
        }
    }

    fn shown(&self) -> MutexGuard<'_, Option<(ChatId, usize)>> {
        self.shown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mirror(&self, chat: Option<&Chat>) {
        if let Some(path) = &self.transcript_path {
            if let Err(e) = transcript::write_transcript(path, chat) {
                tracing::warn!("{:#}", e);
            }
        }
    }
}

/// Format one message for the terminal
pub fn format_message(message: &Message) -> String {
    let label = match message.role {
        Role::User => message.role.label().green().bold(),
        Role::Assistant => message.role.label().cyan().bold(),
    };

    let mut out = format!("{}:\n", label);
    let mut in_fence = false;
    for line in message.content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push_str(&format!("{}\n", line.dimmed()));
        } else if in_fence {
            out.push_str(&format!("{}\n", line.yellow()));
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Format the creation time of a chat for listings
pub fn format_created_at(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

impl ChatView for TerminalView {
    fn render_messages(&self, chat: &Chat) {
        let skip = {
            let mut shown = self.shown();
            let skip = match shown.as_ref() {
                Some((id, count)) if *id == chat.id && *count <= chat.messages.len() => *count,
                _ => 0,
            };
            *shown = Some((chat.id.clone(), chat.messages.len()));
            skip
        };

        if skip == 0 {
            println!("\n{} {}", "──".dimmed(), chat.title.bold());
        }
        for message in chat.messages.iter().skip(skip) {
            println!("{}", format_message(message));
        }
        self.mirror(Some(chat));
    }

    fn clear_messages(&self) {
        *self.shown() = None;
        println!();
        self.mirror(None);
    }

    fn render_chat_list(&self, entries: &[ChatListEntry]) {
        if entries.is_empty() {
            println!("{}", "No chats yet. Type /new to start one.".dimmed());
            return;
        }

        println!("\n{}", "Chats:".bold());
        for entry in entries {
            let marker = if entry.active { "*" } else { " " };
            let title = if entry.editing {
                format!("{} {}", entry.title, "[editing]".yellow())
            } else if entry.active {
                entry.title.bold().to_string()
            } else {
                entry.title.clone()
            };
            println!(
                "  {} {:>2}. {}  {}  {}",
                marker.green(),
                entry.position,
                title,
                entry.model.cyan(),
                format_created_at(&entry.created_at).dimmed()
            );
        }
        println!();
    }

    fn set_model_indicator(&self, model: &str) {
        println!("{} {}", "Model:".bold(), model.cyan());
    }

    fn notify_error(&self, message: &str) {
        eprintln!("{}", format!("Error: {}", message).red());
    }

    fn notify_info(&self, message: &str) {
        println!("{}", message.green());
    }

    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt.yellow());
        if std::io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}
