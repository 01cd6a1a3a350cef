//! Recency budget-fill context strategy.

use async_trait::async_trait;
use memory_core::{Context, Selection};
use tracing::info;

use super::strategy::RelevanceStrategy;

/// Newest contexts first; accepts each while the running token sum stays within `budget`
/// and stops at the first context that would overflow. No packing past that point.
#[derive(Debug, Clone)]
pub struct BudgetFillStrategy {
    budget: usize,
}

impl BudgetFillStrategy {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }
}

#[async_trait]
impl RelevanceStrategy for BudgetFillStrategy {
    fn name(&self) -> &str {
        "BudgetFill"
    }

    async fn select(&self, _query: &str, contexts: &[Context]) -> Result<Selection, anyhow::Error> {
        let mut candidates: Vec<&Context> = contexts.iter().collect();
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut used = 0usize;
        let mut selected = Vec::new();
        for ctx in candidates {
            if used + ctx.token_count > self.budget {
                break;
            }
            used += ctx.token_count;
            selected.push(ctx.clone());
        }
        info!(
            candidates = contexts.len(),
            selected = selected.len(),
            tokens_used = used,
            budget = self.budget,
            "BudgetFillStrategy: selection done"
        );
        Ok(Selection::new(selected))
    }
}
