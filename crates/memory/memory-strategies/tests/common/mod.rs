//! Shared test utilities for memory-strategies integration tests.
//!
//! Provides a word-counting Tokenizer, a keyword EmbeddingService and Context builders.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use embedding::EmbeddingService;
use llm_client::Tokenizer;
use memory_core::{Context, ContextMetadata};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts whitespace-separated words.
#[allow(dead_code)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> anyhow::Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Embeds text on three axes: mentions of "sky", "food", "code". Text with none maps to zero.
#[allow(dead_code)]
#[derive(Default)]
pub struct KeywordEmbedding {
    pub batch_calls: AtomicUsize,
}

impl KeywordEmbedding {
    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        ["sky", "food", "code"]
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Embedding backend that always fails.
#[allow(dead_code)]
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingService for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Err(anyhow::anyhow!("embedding runtime unavailable"))
    }
}

/// Context created `age_secs` seconds before `base`.
#[allow(dead_code)]
pub fn context(id: &str, text: &str, token_count: usize, base: DateTime<Utc>, age_secs: i64) -> Context {
    Context {
        id: id.to_string(),
        text: text.to_string(),
        token_count,
        created_at: base - Duration::seconds(age_secs),
        metadata: ContextMetadata::new(),
        embedding: None,
        similarity: None,
    }
}
