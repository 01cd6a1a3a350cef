//! # LLM client abstraction
//!
//! Defines the narrow capability interfaces the chat core is written against:
//! [`Tokenizer`] for token counting and [`Generator`] for readiness probing, model loading and
//! streamed generation. Any local inference backend (or a fake in tests) can implement them.
//!
//! The stream method takes a `dyn` callback so that [`Generator`] is object-safe.

use anyhow::Result;
use async_trait::async_trait;
use prompt::ChatMessage;

mod config;
mod tokenizer;

pub use config::GenerationConfig;
pub use tokenizer::{estimate_tokens, EstimateTokenizer, Tokenizer};

/// A chunk of streamed generator output.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    pub fn finished() -> Self {
        Self {
            content: String::new(),
            done: true,
        }
    }
}

/// Type-erased chunk callback. Invoked once per chunk, in the order chunks are produced.
/// Returning `Err` asks the generator to stop streaming.
pub type StreamChunkCallback<'a> = dyn FnMut(StreamChunk) -> Result<()> + Send + 'a;

/// Local generation capability: probe, load, and stream a completion for a list of messages.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Readiness probe (device/runtime availability). Returns a short description on success.
    async fn check(&self) -> Result<String>;

    /// Loads model weights and tokenizer. Completes when the model can generate.
    async fn load(&self) -> Result<()>;

    /// Streamed completion: invokes `callback` for each chunk and returns the full reply text.
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        config: &GenerationConfig,
        callback: &mut StreamChunkCallback<'_>,
    ) -> Result<String>;
}
