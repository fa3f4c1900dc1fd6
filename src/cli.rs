//! Command-line interface definition for Parlor
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat command, one-shot chat management
//! commands and a message renderer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parlor - terminal chat client
///
/// Talk to a hosted chat backend, keep conversations in sync with it and
/// render replies as HTML transcripts.
#[derive(Parser, Debug, Clone)]
#[command(name = "parlor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/parlor.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the backend base URL from config
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Override the default model from config
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Parlor
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Manage stored chats without entering the chat loop
    Chats {
        /// Chat management subcommand
        #[command(subcommand)]
        command: ChatsCommand,
    },

    /// Format a message as an HTML fragment and print it
    Render {
        /// File to read; standard input when omitted
        path: Option<PathBuf>,

        /// Render as an assistant message instead of a user message
        #[arg(short, long)]
        assistant: bool,
    },
}

/// Chat management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ChatsCommand {
    /// List stored chats, newest first
    List,

    /// Delete a stored chat
    Delete {
        /// Id of the chat to delete
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/parlor.yaml".to_string()),
            verbose: false,
            backend_url: None,
            model: None,
            command: Commands::Chat,
        }
    }
}
