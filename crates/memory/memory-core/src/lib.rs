//! # Memory Core
//!
//! Context store for the chat core: short user-curated text snippets ("contexts") with token
//! counts, creation time and opaque metadata, kept under a per-context and a total token ceiling.
//!
//! ## External Interactions
//!
//! - **llm-client**: [`Tokenizer`](llm_client::Tokenizer) computes `token_count` at add time
//! - **embedding**: optional [`EmbeddingService`](embedding::EmbeddingService) stores a vector per context

pub mod error;
pub mod store;
pub mod strategy_result;
pub mod types;

pub use error::ContextError;
pub use store::ContextStore;
pub use strategy_result::Selection;
pub use types::*;
