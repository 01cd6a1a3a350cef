//! # Text Embeddings
//!
//! This crate defines the embedding capability interface used by semantic context selection,
//! plus the vector similarity used to rank stored contexts against a query.

use async_trait::async_trait;

mod similarity;

pub use similarity::{cosine_similarity, magnitude};

/// Service for generating text embeddings.
///
/// The concrete backend (a locally loaded embedding model, a fake in tests) is opaque to the core.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generates an embedding vector for a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error>;

    /// Generates embedding vectors for multiple texts in one call.
    /// The default implementation embeds each text in turn.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
