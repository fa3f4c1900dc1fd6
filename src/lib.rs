//! Parlor - terminal chat client library
//!
//! This library provides the core functionality of Parlor, a chat client
//! that keeps conversations on a hosted backend and renders replies as HTML.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `chat`: Chat data model, the chat store and per-session state
//! - `backend`: Backend contract, the HTTP client and an in-memory fake
//! - `controller`: Chat lifecycle, send/receive round trip and bootstrap
//! - `formatter`: Markdown subset to HTML conversion
//! - `view`: Rendering seam (terminal, recording and HTML transcripts)
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use parlor::backend::HttpBackend;
//! use parlor::controller::{start_session, ControllerOptions};
//! use parlor::view::TerminalView;
//! use parlor::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/parlor.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let backend = Arc::new(HttpBackend::new(&config.backend)?);
//!     let view = Arc::new(TerminalView::new(None));
//!     let (controller, _report) = start_session(
//!         backend,
//!         view,
//!         ControllerOptions::from(&config.chat),
//!         &config.chat.default_model,
//!     )
//!     .await;
//!
//!     controller.create_chat();
//!     controller.send_message("Hello!").await;
//!     controller.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod formatter;
pub mod metrics;
pub mod view;

// Re-export commonly used types
pub use backend::{ChatBackend, HttpBackend};
pub use chat::{Chat, ChatId, Message, Role, SessionState};
pub use config::Config;
pub use controller::{ConversationController, SendOutcome};
pub use error::{ParlorError, Result};
pub use formatter::format;
