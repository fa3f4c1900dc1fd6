//! Special commands parser for interactive chat mode
//!
//! Special commands manage chats instead of being sent as messages:
//! - Create, list, switch, rename and delete chats
//! - Change the model of the current chat
//! - Export the current chat as an HTML transcript
//! - Show status and help, log out, exit
//!
//! Commands are prefixed with `/`. The keyword is case-insensitive; its
//! arguments keep their case.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Create a chat with the selected model
    NewChat,

    /// Render the chat list
    ListChats,

    /// Switch to a chat by list position or id
    SwitchChat(String),

    /// Rename a chat; `target` defaults to the active chat
    Rename {
        target: Option<String>,
        title: String,
    },

    /// Enter edit mode; the next line becomes the title
    Edit(Option<String>),

    /// Delete a chat, after confirmation
    Delete(Option<String>),

    /// Change the model of the active chat
    SwitchModel(String),

    /// List the configured models
    ListModels,

    /// Write the active chat as HTML
    Export(PathBuf),

    /// Display session status
    ShowStatus,

    /// Display help information
    Help,

    /// End the backend session
    Logout,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent as a chat message.
    None,
}

/// Split `/keyword rest` into a lowercase keyword and the untouched rest
fn split_command(input: &str) -> (String, &str) {
    match input.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword.to_lowercase(), rest.trim()),
        None => (input.to_lowercase(), ""),
    }
}

fn optional(rest: &str) -> Option<String> {
    (!rest.is_empty()).then(|| rest.to_string())
}

fn required(rest: &str, command: &str, usage: &str) -> Result<String, CommandError> {
    optional(rest).ok_or_else(|| CommandError::MissingArgument {
        command: command.to_string(),
        usage: usage.to_string(),
    })
}

fn single(rest: &str, command: &str) -> Result<Option<String>, CommandError> {
    let mut parts = rest.split_whitespace();
    let first = parts.next().map(str::to_string);
    match parts.next() {
        Some(extra) => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: extra.to_string(),
        }),
        None => Ok(first),
    }
}

/// Parse `/rename` arguments
///
/// A leading all-digit token followed by more text selects the chat; any
/// other text is the new title of the active chat.
fn parse_rename(rest: &str) -> Result<SpecialCommand, CommandError> {
    let title = required(rest, "/rename", "/rename [n|id] <title>")?;
    if let Some((first, remainder)) = title.split_once(char::is_whitespace) {
        if first.chars().all(|c| c.is_ascii_digit()) {
            return Ok(SpecialCommand::Rename {
                target: Some(first.to_string()),
                title: remainder.trim().to_string(),
            });
        }
    }
    Ok(SpecialCommand::Rename {
        target: None,
        title,
    })
}

/// Parse a user input string into a special command
///
/// # Arguments
///
/// * `input` - The user input string to parse
///
/// # Returns
///
/// Returns Ok(SpecialCommand) for valid commands or SpecialCommand::None for non-commands.
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use parlor::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/switch 2").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchChat("2".to_string()));
///
/// let cmd = parse_special_command("/Model gpt-4o").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchModel("gpt-4o".to_string()));
///
/// let cmd = parse_special_command("hello there").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // Only exit/quit work without the slash
    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (keyword, rest) = split_command(trimmed);
    match keyword.as_str() {
        "/new" => Ok(SpecialCommand::NewChat),
        "/chats" | "/list" => Ok(SpecialCommand::ListChats),
        "/switch" => {
            let target = single(rest, "/switch")?.ok_or_else(|| CommandError::MissingArgument {
                command: "/switch".to_string(),
                usage: "/switch <n|id>".to_string(),
            })?;
            Ok(SpecialCommand::SwitchChat(target))
        }
        "/rename" => parse_rename(rest),
        "/edit" => Ok(SpecialCommand::Edit(single(rest, "/edit")?)),
        "/delete" => Ok(SpecialCommand::Delete(single(rest, "/delete")?)),
        "/model" => {
            let model = single(rest, "/model")?.ok_or_else(|| CommandError::MissingArgument {
                command: "/model".to_string(),
                usage: "/model <model_name>".to_string(),
            })?;
            Ok(SpecialCommand::SwitchModel(model))
        }
        "/models" => match rest {
            "" => Ok(SpecialCommand::ListModels),
            arg => Err(CommandError::UnsupportedArgument {
                command: "/models".to_string(),
                arg: arg.to_string(),
            }),
        },
        "/export" => Ok(SpecialCommand::Export(PathBuf::from(required(
            rest,
            "/export",
            "/export <path>",
        )?))),
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/logout" => Ok(SpecialCommand::Logout),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(keyword)),
    }
}

/// Display help text for special commands
///
/// # Examples
///
/// ```
/// use parlor::commands::special_commands::print_help;
///
/// print_help();
/// ```
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

CHATS:
  /new                  - Start a new chat with the selected model
  /chats                - Show the chat list (newest first)
  /list                 - Same as /chats
  /switch <n|id>        - Switch to chat number n in the list, or by id
  /rename [n] <title>   - Rename a chat (the current one by default)
  /edit [n|id]          - Edit a chat title; the next line is the new title
  /delete [n|id]        - Delete a chat (the current one by default)

MODELS:
  /models               - Show the configured models
  /model <name>         - Use a different model for the current chat

SESSION:
  /export <path>        - Write the current chat as an HTML transcript
  /status               - Show session status
  /logout               - End the backend session
  /help                 - Show this help message
  /?                    - Same as /help

SESSION CONTROL:
  exit                  - Exit interactive mode
  quit                  - Same as exit

NOTES:
  - Commands are case-insensitive; their arguments are not
  - Regular text (not starting with /) is sent as a message
  - Alt+Enter inserts a newline; Enter sends
  - Replies arrive in the chat they were sent from, even after switching
"#
    );
}
