//! Core types for the context store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque key-value metadata attached to a context by the caller.
pub type ContextMetadata = BTreeMap<String, serde_json::Value>;

/// Token budgets shared by every component that counts tokens. Read-only after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudgets {
    /// Per-context cap; also the budget for budget-fill selection.
    pub max_context_length: usize,
    /// Cap on the sum of all stored contexts.
    pub max_total_length: usize,
    /// History window cap used by truncation.
    pub max_message_length: usize,
}

impl Default for TokenBudgets {
    fn default() -> Self {
        Self {
            max_context_length: 256,
            max_total_length: 1024,
            max_message_length: 1024,
        }
    }
}

/// A stored text snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: String,
    pub text: String,
    pub token_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: ContextMetadata,
    /// Present only when the store was built with an embedder.
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    /// Per-query score; never persisted.
    #[serde(skip)]
    pub similarity: Option<f32>,
}

/// Payload of an add request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContext {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: ContextMetadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewContext {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: ContextMetadata::new(),
            created_at: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Result of a successful add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAdded {
    pub token_count: usize,
    pub total_tokens: usize,
}

/// Running total after remove/clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextTotals {
    pub total_tokens: usize,
}
