//! Context store errors.

use thiserror::Error;

/// Errors from context store operations. Capacity errors are detected before any mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("Context too long: {token_count} tokens exceeds the per-context limit of {max}")]
    ContextTooLong { token_count: usize, max: usize },

    #[error("Total context budget exceeded: {current} + {requested} tokens exceeds the limit of {max}")]
    TotalBudgetExceeded {
        current: usize,
        requested: usize,
        max: usize,
    },

    #[error("Context id already stored: {0}")]
    DuplicateId(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl ContextError {
    /// True for failures of the tokenizer/embedder rather than of the request itself.
    pub fn is_capability_failure(&self) -> bool {
        matches!(self, ContextError::Tokenizer(_) | ContextError::Embedding(_))
    }
}
