//! # Selection
//!
//! Result returned by relevance strategies: the selected contexts in rank order and the text
//! handed to prompt assembly.

use crate::types::Context;

/// Contexts chosen for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected contexts, most relevant (or most recent) first. `similarity` is set in semantic mode.
    pub contexts: Vec<Context>,
}

impl Selection {
    pub fn new(contexts: Vec<Context>) -> Self {
        Self { contexts }
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Context bodies joined by a blank line, in selection order.
    pub fn text(&self) -> String {
        prompt::join_contexts(self.contexts.iter().map(|c| c.text.as_str()))
    }

    pub fn context_ids(&self) -> Vec<String> {
        self.contexts.iter().map(|c| c.id.clone()).collect()
    }

    pub fn total_tokens(&self) -> usize {
        self.contexts.iter().map(|c| c.token_count).sum()
    }
}
