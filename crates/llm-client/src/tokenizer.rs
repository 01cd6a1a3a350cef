//! Token counting capability.

use anyhow::Result;

/// Counts tokenizer units in a text. Every budget in the core is expressed in these units.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

/// Estimates the token count for a text string (about four bytes per token).
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    ((text.len() as f64) / 4.0).ceil().max(1.0) as usize
}

/// Tokenizer that uses [`estimate_tokens`]; for backends without a real vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateTokenizer;

impl Tokenizer for EstimateTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(estimate_tokens(text))
    }
}
