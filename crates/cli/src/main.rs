//! Quillpad CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Create the config directory and a starter config.toml
//! - `serve`  — Start the HTTP gateway
//! - `chat`   — Send a message to a running gateway and stream the reply
//! - `config` — Print the effective configuration
//! - `doctor` — Diagnose setup problems

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quillpad",
    about = "Quillpad — document assistant with a streaming chat gateway",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a starter config.toml
    Init,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message to a running gateway and stream the reply
    Chat {
        /// The message to send
        message: String,

        /// Continue an existing chat
        #[arg(long)]
        chat_id: Option<String>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Bearer token (defaults to $QUILLPAD_TOKEN)
        #[arg(short, long)]
        token: Option<String>,

        /// Gateway base URL (defaults to the configured host and port)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Print the effective configuration
    Config,

    /// Diagnose setup problems
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            message,
            chat_id,
            model,
            token,
            url,
        } => commands::chat::run(message, chat_id, model, token, url).await?,
        Commands::Config => commands::config_cmd::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
