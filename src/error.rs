//! Error types for Parlor
//!
//! This module defines the error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parlor operations
///
/// Covers configuration loading, backend calls, chat lifecycle
/// operations and terminal I/O.
#[derive(Error, Debug)]
pub enum ParlorError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend call failed before a response status was available
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {message}")]
    BackendStatus {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Login rejected or session expired
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The referenced chat is not in the store
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    /// An operation needed an active chat but none is selected
    #[error("No active chat")]
    NoActiveChat,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Line editor errors
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Result type alias for Parlor operations
///
/// Uses `anyhow::Error` so callers can attach context while the
/// typed [`ParlorError`] stays available through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
