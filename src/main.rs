//! Parlor - terminal chat client
//!
#![doc = "Main entry point for the Parlor chat client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parlor::cli::{Cli, Commands};
use parlor::commands;
use parlor::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/parlor.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat => {
            tracing::info!("Starting interactive chat mode");
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Chats { command } => {
            tracing::info!("Starting chat management command");
            commands::chats::handle_chats(&config, command).await?;
            Ok(())
        }
        Commands::Render { path, assistant } => {
            if let Some(p) = &path {
                tracing::debug!("Rendering message from: {}", p.display());
            }
            commands::render::run_render(path.as_deref(), assistant)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with rendered output.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "parlor=debug" } else { "parlor=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
