//! showcache - caching proxy for TMDB TV lookups
//!
//! Serves `POST /tv/search` and `POST /tv/details`, answering repeated
//! requests from an on-disk JSON cache instead of calling TMDB again.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use showcache::cli::Cli;
use showcache::config::Config;
use showcache::server::{self, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug when set
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting showcache...");

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env()?.with_cli(cli);
    info!(?config, "Configuration loaded");

    let state = AppState::open(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    server::run(listener, state).await?;

    Ok(())
}
