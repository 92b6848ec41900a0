//! Keychat - OpenAI API key tester and streaming chat client
//!
//! This is the main entry point for the `keychat` binary.

use anyhow::Result;
use clap::{Parser, Subcommand};
use keychat::{telemetry, Config};
use tracing::{debug, info};

mod commands;

#[derive(Parser)]
#[command(name = "keychat", about = "Test an OpenAI API key and chat with it")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an API key against the models endpoint
    Test(commands::key::TestArgs),
    /// Start an interactive chat session
    Chat(commands::chat::ChatArgs),
    /// Print the equivalent curl command for the key test
    Curl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    telemetry::init_tracing(config.log_format, cli.verbose);
    debug!(api_url = %config.openai_api_url, "Configuration loaded");

    telemetry::init_metrics();

    match cli.command {
        Commands::Test(args) => commands::key::run_test(config, args).await,
        Commands::Chat(args) => {
            info!("Starting Keychat");
            commands::chat::run(config, args).await
        }
        Commands::Curl => commands::key::run_curl(&config),
    }
}
