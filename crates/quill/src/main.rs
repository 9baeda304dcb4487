//! Quill - conversational assistant session server.
//!
//! Main entry point for the Quill CLI.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use quill_flow::{FlowOrchestrator, TurnHandler};
use quill_llm::{HttpGenerator, HttpGeneratorConfig, SharedGenerator};
use quill_server::{Server, ServerConfig};
use quill_session::{ConversationStore, SessionConfig, StoreConfig, TokenService};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Quill - conversational assistant session server
#[derive(Parser)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the assistant HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Token-signing secret; a random one is generated when omitted,
    /// which invalidates outstanding tokens on restart
    #[arg(long, env = "QUILL_SESSION_SECRET")]
    pub secret: Option<String>,

    /// Session token lifetime in seconds
    #[arg(long, default_value_t = 3600)]
    pub token_ttl_secs: u64,

    /// Base URL of the chat-completions endpoint
    #[arg(long, env = "QUILL_LLM_BASE_URL", default_value = "http://localhost:11434/v1")]
    pub llm_base_url: String,

    /// Model name for generation calls
    #[arg(long, env = "QUILL_LLM_MODEL", default_value = "llama3")]
    pub model: String,

    /// API key for the generation endpoint
    #[arg(long, env = "QUILL_LLM_API_KEY")]
    pub api_key: Option<String>,

    /// Allowed CORS origin; repeatable
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing — console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "quill=debug,quill_session=debug,quill_llm=debug,quill_flow=debug,quill_server=debug,info"
    } else {
        "quill=info,quill_session=info,quill_llm=info,quill_flow=info,quill_server=info,warn"
    };

    let log_dir = dirs::data_local_dir()
        .map(|d| d.join("quill").join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "quill.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "quill=trace,quill_session=trace,quill_llm=trace,quill_flow=trace,quill_server=trace,info",
                )),
        )
        .init();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let secret = match args.secret {
        Some(s) => s.into_bytes(),
        None => {
            warn!("No signing secret configured; tokens will not survive a restart");
            SessionConfig::generate_secret()
        }
    };

    let session_config = SessionConfig::new(secret)
        .with_token_ttl(Duration::from_secs(args.token_ttl_secs));
    let tokens = TokenService::new(session_config);
    let store = ConversationStore::new(StoreConfig::new());

    let mut generator_config = HttpGeneratorConfig::new(&args.llm_base_url, &args.model);
    if let Some(key) = args.api_key {
        generator_config = generator_config.with_api_key(key);
    }
    let generator: SharedGenerator = Arc::new(HttpGenerator::new(generator_config)?);

    info!(
        bind = %args.bind,
        model = %args.model,
        endpoint = %args.llm_base_url,
        "Starting Quill assistant server"
    );

    let handler = TurnHandler::new(tokens, store, FlowOrchestrator::new(generator));
    let server_config = ServerConfig::new()
        .with_bind_address(args.bind)
        .with_cors_origins(args.cors_origins);

    Server::new(handler, server_config).run().await?;
    Ok(())
}
