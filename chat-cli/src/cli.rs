//! CLI parser and service wiring.

use crate::loopback::{EchoGenerator, HashEmbedding};
use anyhow::{Context, Result};
use chat_runtime::{Capabilities, ChatConfig, ChatService};
use clap::{Parser, Subcommand};
use llm_client::EstimateTokenizer;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Local chat core: context-budgeted prompts and streamed replies", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat (config from env; flags override).
    Run {
        /// Use semantic selection instead of newest-first budget fill.
        #[arg(long)]
        semantic: bool,
        /// Delay between streamed chunks, in milliseconds.
        #[arg(long, default_value = "30")]
        chunk_delay_ms: u64,
    },
    /// Probe the generation backend and exit.
    Check,
}

/// Builds a service on the loopback backend.
pub fn build_service(config: &ChatConfig, chunk_delay: Duration) -> Result<ChatService> {
    let capabilities = Capabilities {
        tokenizer: Arc::new(EstimateTokenizer),
        generator: Arc::new(EchoGenerator::new(chunk_delay)),
        embedder: Some(Arc::new(HashEmbedding::default())),
    };
    ChatService::new(config, capabilities).context("Failed to build chat service")
}
