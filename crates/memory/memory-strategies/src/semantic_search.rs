//! Semantic similarity context strategy.

use async_trait::async_trait;
use embedding::{cosine_similarity, EmbeddingService};
use memory_core::{Context, Selection};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::strategy::RelevanceStrategy;

/// Contexts must score strictly above this to be selected.
pub const DEFAULT_MIN_SCORE: f32 = 0.7;

/// Maximum number of contexts returned.
pub const DEFAULT_MAX_RESULTS: usize = 3;

pub struct SemanticSearchStrategy {
    max_results: usize,
    min_score: f32,
    embedding_service: Arc<dyn EmbeddingService>,
}

impl SemanticSearchStrategy {
    pub fn new(max_results: usize, embedding_service: Arc<dyn EmbeddingService>, min_score: f32) -> Self {
        Self { max_results, min_score, embedding_service }
    }

    pub fn with_defaults(embedding_service: Arc<dyn EmbeddingService>) -> Self {
        Self::new(DEFAULT_MAX_RESULTS, embedding_service, DEFAULT_MIN_SCORE)
    }

    /// Embeddings for `contexts`, computing the missing ones in one batch call.
    async fn context_embeddings(&self, contexts: &[Context]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        let missing: Vec<String> = contexts
            .iter()
            .filter(|c| c.embedding.is_none())
            .map(|c| c.text.clone())
            .collect();
        let computed = if missing.is_empty() {
            Vec::new()
        } else {
            debug!(count = missing.len(), "SemanticSearchStrategy: embedding contexts without stored vectors");
            self.embedding_service.embed_batch(&missing).await?
        };
        let mut computed = computed.into_iter();
        let mut out = Vec::with_capacity(contexts.len());
        for ctx in contexts {
            match &ctx.embedding {
                Some(v) => out.push(v.clone()),
                None => out.push(computed.next().ok_or_else(|| {
                    anyhow::anyhow!("embedding backend returned fewer vectors than requested")
                })?),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl RelevanceStrategy for SemanticSearchStrategy {
    fn name(&self) -> &str {
        "SemanticSearch"
    }

    async fn select(&self, query: &str, contexts: &[Context]) -> Result<Selection, anyhow::Error> {
        let query_text = query.trim();
        if query_text.is_empty() || contexts.is_empty() {
            debug!(candidates = contexts.len(), "SemanticSearchStrategy: no query text or no contexts, skipping");
            return Ok(Selection::default());
        }
        info!(query_len = query_text.len(), candidates = contexts.len(), max_results = self.max_results, "SemanticSearchStrategy: starting semantic search");

        let query_embedding = self.embedding_service.embed(query_text).await?;
        let embeddings = self.context_embeddings(contexts).await?;

        let mut scored: Vec<(f32, &Context)> = contexts
            .iter()
            .zip(embeddings.iter())
            .map(|(ctx, emb)| (cosine_similarity(&query_embedding, emb), ctx))
            .collect();

        if !scored.is_empty() {
            let min_s = scored.iter().map(|(s, _)| *s).fold(f32::NAN, f32::min);
            let max_s = scored.iter().map(|(s, _)| *s).fold(f32::NAN, f32::max);
            info!(count = scored.len(), score_min = %min_s, score_max = %max_s, "SemanticSearchStrategy: score distribution");
        }

        let count_before = scored.len();
        scored.retain(|(score, _)| *score > self.min_score);
        if count_before > 0 && scored.is_empty() {
            warn!(min_score = self.min_score, count_before, "SemanticSearchStrategy: all contexts below threshold");
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.max_results);

        let selected: Vec<Context> = scored
            .into_iter()
            .map(|(score, ctx)| {
                let mut ctx = ctx.clone();
                ctx.similarity = Some(score);
                ctx
            })
            .collect();
        info!(selected = selected.len(), "SemanticSearchStrategy: selection done");
        Ok(Selection::new(selected))
    }
}
