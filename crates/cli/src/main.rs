//! localseek CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive session or a single question
//! - `init`    — Write the default config file
//! - `doctor`  — Check config, endpoint and model
//! - `models`  — List models installed on the endpoint

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "localseek",
    about = "localseek — web search answered by a local model",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of ~/.localseek/config.toml
    #[arg(short, long, global = true, env = "LOCALSEEK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask questions (interactive unless --message is given)
    Chat {
        /// Ask a single question and exit
        #[arg(short, long)]
        message: Option<String>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// Start with conversation history disabled
        #[arg(long)]
        no_history: bool,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Diagnose configuration and endpoint health
    Doctor,

    /// List models available on the inference endpoint
    Models,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the streamed answer
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat {
            message,
            model,
            no_history,
        } => {
            let options = commands::chat::ChatOptions {
                message,
                model,
                no_history,
            };
            commands::chat::run(config_path, options).await?
        }
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Models => commands::models::run(config_path).await?,
    }

    Ok(())
}
