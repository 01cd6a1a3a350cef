//! Token-budgeted context store.

use crate::error::ContextError;
use crate::types::{Context, ContextAdded, ContextTotals, NewContext, TokenBudgets};
use chrono::Utc;
use embedding::EmbeddingService;
use llm_client::Tokenizer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Holds contexts under two ceilings: `max_context_length` per item and `max_total_length`
/// for the sum. Every failed operation leaves the store unchanged.
///
/// Mutations take `&mut self`; callers share the store behind a single writer (the chat
/// service) so an add never interleaves with a remove's bookkeeping.
pub struct ContextStore {
    contexts: Vec<Context>,
    total_tokens: usize,
    budgets: TokenBudgets,
    tokenizer: Arc<dyn Tokenizer>,
    embedder: Option<Arc<dyn EmbeddingService>>,
}

impl ContextStore {
    pub fn new(budgets: TokenBudgets, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            contexts: Vec::new(),
            total_tokens: 0,
            budgets,
            tokenizer,
            embedder: None,
        }
    }

    /// Computes and stores an embedding for every added context.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingService>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn budgets(&self) -> TokenBudgets {
        self.budgets
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.id == id)
    }

    /// Validates budgets, then inserts. No partial insert on failure.
    pub async fn add(&mut self, new: NewContext) -> Result<ContextAdded, ContextError> {
        if self.get(&new.id).is_some() {
            warn!(id = %new.id, "Context add rejected: duplicate id");
            return Err(ContextError::DuplicateId(new.id));
        }

        let token_count = self
            .tokenizer
            .count_tokens(&new.text)
            .map_err(|e| ContextError::Tokenizer(e.to_string()))?;

        if token_count > self.budgets.max_context_length {
            warn!(
                id = %new.id,
                token_count,
                max = self.budgets.max_context_length,
                "Context add rejected: too long"
            );
            return Err(ContextError::ContextTooLong {
                token_count,
                max: self.budgets.max_context_length,
            });
        }

        if self.total_tokens + token_count > self.budgets.max_total_length {
            warn!(
                id = %new.id,
                token_count,
                total_tokens = self.total_tokens,
                max = self.budgets.max_total_length,
                "Context add rejected: total budget exceeded"
            );
            return Err(ContextError::TotalBudgetExceeded {
                current: self.total_tokens,
                requested: token_count,
                max: self.budgets.max_total_length,
            });
        }

        let embedding = match &self.embedder {
            Some(embedder) => {
                let vector = embedder
                    .embed(&new.text)
                    .await
                    .map_err(|e| ContextError::Embedding(e.to_string()))?;
                debug!(id = %new.id, dimension = vector.len(), "Context embedding computed");
                Some(vector)
            }
            None => None,
        };

        self.contexts.push(Context {
            id: new.id.clone(),
            text: new.text,
            token_count,
            created_at: new.created_at.unwrap_or_else(Utc::now),
            metadata: new.metadata,
            embedding,
            similarity: None,
        });
        self.total_tokens += token_count;

        info!(
            id = %new.id,
            token_count,
            total_tokens = self.total_tokens,
            count = self.contexts.len(),
            "Context added"
        );
        Ok(ContextAdded {
            token_count,
            total_tokens: self.total_tokens,
        })
    }

    /// Removes `id` if present. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: &str) -> ContextTotals {
        match self.contexts.iter().position(|c| c.id == id) {
            Some(index) => {
                let removed = self.contexts.remove(index);
                self.total_tokens -= removed.token_count;
                info!(id, total_tokens = self.total_tokens, "Context removed");
            }
            None => debug!(id, "Context remove: id not stored"),
        }
        ContextTotals {
            total_tokens: self.total_tokens,
        }
    }

    pub fn clear(&mut self) -> ContextTotals {
        let count = self.contexts.len();
        self.contexts.clear();
        self.total_tokens = 0;
        info!(count, "Contexts cleared");
        ContextTotals { total_tokens: 0 }
    }

    /// All contexts, most recently created first. Ties keep the later insertion first.
    pub fn list(&self) -> Vec<Context> {
        let mut out: Vec<Context> = self.contexts.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}
