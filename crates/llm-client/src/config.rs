//! Sampling and output-length parameters passed to the generator on every call.

use serde::{Deserialize, Serialize};

/// Generation parameters; fixed at process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on generated tokens per call.
    pub max_new_tokens: usize,
    pub temperature: f32,
    /// Nucleus-sampling threshold.
    pub top_p: f32,
    /// Generation stops when any of these sequences is produced.
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            stop_sequences: Vec::new(),
        }
    }
}

impl GenerationConfig {
    /// Returns the prefix of `text` that ends before the earliest stop sequence, if any occurs.
    pub fn truncate_at_stop<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.stop_sequences
            .iter()
            .filter(|s| !s.is_empty())
            .filter_map(|s| text.find(s.as_str()))
            .min()
            .map(|idx| &text[..idx])
    }
}
