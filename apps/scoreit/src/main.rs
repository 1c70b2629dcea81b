mod api_client;
mod auth;
mod cli;
mod commands;
mod config;
mod credentials;
mod errors;
mod history;
mod models;
mod pipeline;
mod state;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands};
use crate::commands::Mode;
use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Malformed environment values fail here, before anything touches the network.
    let config = Config::from_env()?;

    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting ScoreIt client v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Backend {} (timeout {}s), data dir {}",
        config.backend_url,
        config.http_timeout.as_secs(),
        config.data_dir.display()
    );

    let state = AppState::new(config);

    match cli.command {
        Commands::Shell => commands::shell::run(&state).await,
        command => commands::dispatch(&state, command, Mode::OneShot).await,
    }
}
