//! # Context Strategies
//!
//! This crate chooses what goes into the prompt besides the user's own words.
//!
//! Available strategies:
//! - `SemanticSearchStrategy`: ranks stored contexts by cosine similarity to the query embedding,
//!   keeps those above a threshold, top-K
//! - `BudgetFillStrategy`: newest contexts first, greedily accepted while the running token sum
//!   stays within a budget
//!
//! And one history helper:
//! - `truncate_history`: keeps the most recent messages that fit a token budget, in chronological order
//!
//! ## Logging
//!
//! Strategies emit `tracing` logs so that selection can be inspected:
//! - Candidate count and number selected
//! - Similarity score distribution (semantic mode)
//! - Tokens used against the budget (budget-fill mode, truncation)
//!
//! ## External Interactions
//!
//! - **memory-core**: Context, Selection
//! - **embedding**: EmbeddingService for the query embedding, cosine_similarity
//! - **llm-client**: Tokenizer for history token counts

mod budget_fill;
mod recent_messages;
mod semantic_search;
mod strategy;

pub use budget_fill::BudgetFillStrategy;
pub use recent_messages::truncate_history;
pub use semantic_search::{SemanticSearchStrategy, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE};
pub use strategy::RelevanceStrategy;
