/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`   - Interactive chat session
- `chats`  - One-shot chat listing and deletion
- `render` - Format a message as an HTML fragment
- `auth`   - Backend login helper shared by the above

The handlers are thin; chat semantics live in the controllers.
*/

use crate::backend::{ChatBackend, HttpBackend};
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;

// Special commands parser for the chat loop
pub mod special_commands;

// One-shot chat management
pub mod chats;

// Message rendering
pub mod render;

/// Build the HTTP backend and log in when credentials are configured
///
/// # Errors
///
/// Returns error if the backend URL is invalid or the login is rejected
pub async fn connect(config: &Config) -> Result<Arc<HttpBackend>> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    auth::login_if_configured(backend.as_ref(), config).await?;
    Ok(backend)
}

// Backend login
pub mod auth {
    //! Backend login helper.
    //!
    //! The username comes from configuration. The password comes from
    //! `PARLOR_PASSWORD`, or is prompted for with masked input.

    use super::*;
    use crate::error::ParlorError;
    use rustyline::completion::Completer;
    use rustyline::highlight::Highlighter;
    use rustyline::hint::Hinter;
    use rustyline::history::DefaultHistory;
    use rustyline::validate::Validator;
    use rustyline::{Editor, Helper};
    use std::borrow::Cow;

    /// Environment variable holding the login password
    pub const PASSWORD_ENV: &str = "PARLOR_PASSWORD";

    /// Line helper that echoes `*` for every typed character
    struct MaskingHelper;

    impl Completer for MaskingHelper {
        type Candidate = String;
    }

    impl Hinter for MaskingHelper {
        type Hint = String;
    }

    impl Validator for MaskingHelper {}

    impl Highlighter for MaskingHelper {
        fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
            Cow::Owned("*".repeat(line.chars().count()))
        }

        fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
            true
        }
    }

    impl Helper for MaskingHelper {}

    /// Read the password from the environment or the terminal
    ///
    /// # Errors
    ///
    /// Returns error if the terminal cannot be read
    pub fn read_password(username: &str) -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            tracing::debug!("Using password from {}", PASSWORD_ENV);
            return Ok(password);
        }

        let mut rl: Editor<MaskingHelper, DefaultHistory> =
            Editor::new().map_err(ParlorError::from)?;
        rl.set_helper(Some(MaskingHelper));
        let password = rl
            .readline(&format!("Password for {}: ", username))
            .map_err(ParlorError::from)?;
        Ok(password)
    }

    /// Log in when `auth.username` is set; do nothing otherwise
    ///
    /// # Returns
    ///
    /// Whether a login was performed
    ///
    /// # Errors
    ///
    /// Returns error if the password cannot be read or the backend
    /// rejects the credentials
    pub async fn login_if_configured(backend: &dyn ChatBackend, config: &Config) -> Result<bool> {
        let Some(username) = config.auth.username.as_deref() else {
            tracing::debug!("No username configured, skipping login");
            return Ok(false);
        };

        let password = read_password(username)?;
        backend.login(username, &password).await?;
        Ok(true)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serial_test::serial;

        #[test]
        fn test_masking_helper_hides_every_char() {
            assert_eq!(MaskingHelper.highlight("abc", 3), "***");
            assert_eq!(MaskingHelper.highlight("pässwörd", 0), "********");
            assert_eq!(MaskingHelper.highlight("", 0), "");
        }

        #[test]
        fn test_masking_helper_redraws_on_every_char() {
            assert!(MaskingHelper.highlight_char("a", 1, false));
            assert!(MaskingHelper.highlight_char("ab", 2, true));
        }

        #[test]
        #[serial]
        fn test_read_password_prefers_environment() {
            std::env::set_var(PASSWORD_ENV, "hunter2");
            let password = read_password("ada");
            std::env::remove_var(PASSWORD_ENV);
            assert_eq!(password.unwrap(), "hunter2");
        }

        #[tokio::test]
        async fn test_login_skipped_without_username() {
            let backend = crate::backend::FakeBackend::new();
            let performed = login_if_configured(&backend, &Config::default())
                .await
                .unwrap();
            assert!(!performed);
            assert!(backend.calls().is_empty());
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Connects to the backend, bootstraps the session and runs a
    //! readline-based loop. Plain lines are sent as messages in the active
    //! chat; lines starting with `/` are special commands.
    //!
    //! Sends run as background tasks so the prompt returns immediately and
    //! replies print when they arrive.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::controller::{start_session, ControllerOptions, ConversationController, DeleteOutcome};
    use crate::error::ParlorError;
    use crate::view::{write_transcript, ChatView, TerminalView};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::{Cmd, DefaultEditor, KeyCode, KeyEvent, Modifiers};

    /// What the loop does after a command
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Flow {
        Continue,
        Exit,
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    ///
    /// # Examples
    ///
    /// ```
    /// use parlor::commands::chat;
    /// use parlor::config::Config;
    ///
    /// // In application code:
    /// // chat::run_chat(Config::default()).await?;
    /// ```
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let backend = connect(&config).await?;
        let view = Arc::new(TerminalView::new(config.chat.transcript_path.clone()));

        print_welcome_banner(&config);

        let (controller, report) = start_session(
            backend,
            view.clone(),
            ControllerOptions::from(&config.chat),
            &config.chat.default_model,
        )
        .await;
        tracing::debug!("Bootstrap: {:?}", report);

        let mut rl = DefaultEditor::new()?;
        rl.bind_sequence(KeyEvent(KeyCode::Enter, Modifiers::ALT), Cmd::Newline);
        rl.bind_sequence(KeyEvent(KeyCode::Enter, Modifiers::SHIFT), Cmd::Newline);

        loop {
            let prompt = format_prompt(&controller);
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }

                    // In edit mode the next plain line is the new title
                    if controller.chat_list().editing().is_some() {
                        if line.trim_start().starts_with('/') {
                            controller.chat_list().cancel_edit();
                        } else {
                            if let Err(e) = controller.chat_list().commit_edit(&controller, &line) {
                                view.notify_error(&format!("{:#}", e));
                            }
                            continue;
                        }
                    }

                    if line.trim().is_empty() {
                        continue;
                    }

                    match parse_special_command(&line) {
                        Ok(SpecialCommand::None) => send(&controller, view.as_ref(), &line),
                        Ok(command) => {
                            match handle_command(command, &controller, &config).await {
                                Ok(Flow::Continue) => {}
                                Ok(Flow::Exit) => break,
                                Err(e) => view.notify_error(&format!("{:#}", e)),
                            }
                        }
                        Err(e) => eprintln!("{}\n", e.to_string().yellow()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        let pending = controller.sends_in_flight();
        if pending > 0 {
            println!("{}", format!("Cancelling {} pending message(s)...", pending).dimmed());
        }
        controller.shutdown().await;
        println!("Goodbye!");
        Ok(())
    }

    fn send(controller: &ConversationController, view: &dyn ChatView, line: &str) {
        if controller.spawn_send(line).is_none() {
            view.notify_info("No active chat. Type /new to start one.");
        }
    }

    /// Execute one special command
    ///
    /// # Errors
    ///
    /// Returns error if the command fails; the loop reports it and continues
    async fn handle_command(
        command: SpecialCommand,
        controller: &ConversationController,
        config: &Config,
    ) -> Result<Flow> {
        let chat_list = controller.chat_list();
        match command {
            SpecialCommand::NewChat => {
                controller.create_chat();
            }
            SpecialCommand::ListChats => chat_list.render(),
            SpecialCommand::SwitchChat(target) => {
                chat_list.select(controller, &target)?;
            }
            SpecialCommand::Rename { target, title } => {
                chat_list.rename(controller, target.as_deref(), &title)?;
            }
            SpecialCommand::Edit(target) => {
                chat_list.begin_edit(target.as_deref())?;
                println!("{}", "Enter the new title:".yellow());
            }
            SpecialCommand::Delete(target) => {
                if let DeleteOutcome::Deleted { .. } =
                    chat_list.delete(controller, target.as_deref()).await?
                {
                    controller.view().notify_info("Chat deleted");
                }
            }
            SpecialCommand::SwitchModel(model) => {
                if !config.models.iter().any(|m| m == &model) {
                    tracing::warn!("Model {} is not in the configured catalog", model);
                }
                controller.change_model(&model);
            }
            SpecialCommand::ListModels => print_models(config, &controller.selected_model()),
            SpecialCommand::Export(path) => {
                let chat = controller.active_chat().ok_or(ParlorError::NoActiveChat)?;
                write_transcript(&path, Some(&chat))?;
                controller
                    .view()
                    .notify_info(&format!("Exported chat to {}", path.display()));
            }
            SpecialCommand::ShowStatus => print_status_display(controller, config),
            SpecialCommand::Help => print_help(),
            SpecialCommand::Logout => {
                controller.backend().logout().await?;
                controller.view().notify_info("Logged out");
                return Ok(Flow::Exit);
            }
            SpecialCommand::Exit => return Ok(Flow::Exit),
            SpecialCommand::None => {}
        }
        Ok(Flow::Continue)
    }

    fn format_prompt(controller: &ConversationController) -> String {
        let model = controller.selected_model();
        if let Some(id) = controller.chat_list().editing() {
            let title = controller
                .with_state(|state| state.chat(&id).map(|chat| chat.title.clone()).ok())
                .unwrap_or(id);
            return format!("{} {} ", format!("[rename {}]", title).yellow(), ">>>".bold());
        }
        format!("{} {} ", format!("[{}]", model).cyan(), ">>>".bold())
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(config: &Config) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║               Parlor Interactive Chat - Welcome!             ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Backend: {}", config.backend.base_url.cyan());
        println!("Model:   {}\n", config.chat.default_model.cyan());
        println!("Type '/help' for available commands, 'exit' to quit");
        println!("Alt+Enter inserts a newline\n");
    }

    fn print_models(config: &Config, selected: &str) {
        println!("\n{}", "Models:".bold());
        for model in &config.models {
            if model == selected {
                println!("  {} {}", "*".green(), model.bold());
            } else {
                println!("    {}", model);
            }
        }
        if !config.models.iter().any(|m| m == selected) {
            println!("  {} {} {}", "*".green(), selected.bold(), "(not in catalog)".dimmed());
        }
        println!();
    }

    /// Display detailed status information about the current session
    fn print_status_display(controller: &ConversationController, config: &Config) {
        let (chats, active) = controller.with_state(|state| {
            (
                state.store().len(),
                state
                    .active_chat()
                    .map(|chat| (chat.title.clone(), chat.messages.len())),
            )
        });

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Parlor Session Status                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Backend:          {}", config.backend.base_url.cyan());
        println!(
            "User:             {}",
            config.auth.username.as_deref().unwrap_or("(anonymous)")
        );
        println!("Model:            {}", controller.selected_model().cyan());
        println!("Chats:            {}", chats);
        match active {
            Some((title, messages)) => {
                println!("Active Chat:      {}", title.bold());
                println!("Chat Size:        {} messages", messages);
            }
            None => println!("Active Chat:      {}", "none".dimmed()),
        }
        println!("Pending Replies:  {}", controller.sends_in_flight());
        println!();
    }
}
