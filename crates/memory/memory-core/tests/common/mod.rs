//! Shared fakes for memory-core integration tests.

use async_trait::async_trait;
use embedding::EmbeddingService;
use llm_client::Tokenizer;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts whitespace-separated words.
#[allow(dead_code)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> anyhow::Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Tokenizer whose runtime is unavailable.
#[allow(dead_code)]
pub struct BrokenTokenizer;

impl Tokenizer for BrokenTokenizer {
    fn count_tokens(&self, _text: &str) -> anyhow::Result<usize> {
        Err(anyhow::anyhow!("tokenizer not loaded"))
    }
}

/// Embeds text as `[len, 1.0]`; counts calls.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingEmbedding {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingService for CountingEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![text.len() as f32, 1.0])
    }
}

/// Embedding backend that always fails.
#[allow(dead_code)]
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingService for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Err(anyhow::anyhow!("embedding device lost"))
    }
}
