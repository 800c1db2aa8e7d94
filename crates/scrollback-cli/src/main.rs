mod cli;
mod input;
mod logging;
mod render;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use render::RenderOutcome;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let guard = cli.log_dir.as_deref().map(logging::init);

    let config = match cli.reporter_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "ERROR".red().bold(), e);
            std::process::exit(1);
        }
    };
    tracing::info!(cmd = %cli.cmd, server = cli.server, ?config, "starting reporter");

    let (tx, handle) = if cli.server {
        server::spawn_server()
    } else {
        render::spawn_renderer(config)
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let sent = input::forward_events(stdin, tx).await;
    tracing::debug!(sent, "input closed");

    let outcome = handle.await.context("Renderer task panicked")??;
    tracing::info!(?outcome, "reporter finished");

    // Flush file logs before a possible early exit.
    drop(guard);
    if outcome == RenderOutcome::Failed {
        std::process::exit(1);
    }
    Ok(())
}
