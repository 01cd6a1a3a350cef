//! chat CLI: interactive REPL or readiness probe. Config from env (`.env` supported).

use anyhow::Result;
use chat_cli::{build_service, repl, Cli, Commands};
use chat_runtime::{init_tracing, spawn_service, ChatConfig, SelectionMode};
use chrono::Local;
use clap::Parser;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = ChatConfig::load()?;

    let chunk_delay = match &cli.command {
        Commands::Run {
            semantic,
            chunk_delay_ms,
        } => {
            if *semantic {
                config.selection.mode = SelectionMode::Semantic;
            }
            Duration::from_millis(*chunk_delay_ms)
        }
        Commands::Check => Duration::ZERO,
    };
    config.validate()?;

    // The REPL streams replies to stdout, so only the probe echoes log lines there.
    init_tracing(&config.log_file, matches!(cli.command, Commands::Check))?;
    info!(
        start_time = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        log_file = %config.log_file,
        mode = ?config.selection.mode,
        "chat started"
    );

    let (client, _service) = spawn_service(build_service(&config, chunk_delay)?);
    match cli.command {
        Commands::Run { .. } => repl::run(client).await,
        Commands::Check => {
            let detail = client.check().await?;
            println!("ok: {}", detail);
            Ok(())
        }
    }
}
