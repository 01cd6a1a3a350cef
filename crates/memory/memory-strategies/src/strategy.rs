//! Relevance selection strategy trait.

use async_trait::async_trait;
use memory_core::{Context, Selection};

/// Chooses a subset of stored contexts for a query. Both selection modes sit behind this trait.
#[async_trait]
pub trait RelevanceStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// `contexts` is a snapshot of the store; implementations must not assume any order.
    async fn select(&self, query: &str, contexts: &[Context]) -> Result<Selection, anyhow::Error>;
}
