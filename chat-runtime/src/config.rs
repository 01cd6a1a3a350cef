//! Runtime configuration loaded from environment variables.
//! Call `dotenvy::dotenv()` before [`ChatConfig::load`] so `.env` values are visible.

use anyhow::Result;
use llm_client::GenerationConfig;
use memory_core::TokenBudgets;
use memory_strategies::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE};
use std::env;
use std::str::FromStr;

/// How contexts are chosen for a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Newest contexts first, until `max_context_length` is reached.
    #[default]
    Budget,
    /// Top-K by cosine similarity to the query, above `min_score`.
    Semantic,
}

impl FromStr for SelectionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "budget" => Ok(SelectionMode::Budget),
            "semantic" => Ok(SelectionMode::Semantic),
            other => anyhow::bail!("Unknown SELECTION_MODE: {} (expected budget or semantic)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    pub min_score: f32,
    pub max_results: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Budget,
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Chat runtime configuration. Built once at start-up and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub budgets: TokenBudgets,
    pub generation: GenerationConfig,
    pub selection: SelectionConfig,
    /// Mirror selected log points to the caller as `debug` replies.
    pub debug_events: bool,
    pub log_file: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            budgets: TokenBudgets::default(),
            generation: GenerationConfig::default(),
            selection: SelectionConfig::default(),
            debug_events: false,
            log_file: "logs/chat.log".to_string(),
        }
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ChatConfig {
    /// Loads from the environment; unset or unparsable numeric values fall back to defaults.
    /// An unknown `SELECTION_MODE` is an error.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let budgets = TokenBudgets {
            max_context_length: parse_or("MAX_CONTEXT_LENGTH", defaults.budgets.max_context_length),
            max_total_length: parse_or("MAX_TOTAL_LENGTH", defaults.budgets.max_total_length),
            max_message_length: parse_or("MAX_MESSAGE_LENGTH", defaults.budgets.max_message_length),
        };

        let stop_sequences = env::var("STOP_SEQUENCES")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let generation = GenerationConfig {
            max_new_tokens: parse_or("MAX_NEW_TOKENS", defaults.generation.max_new_tokens),
            temperature: parse_or("TEMPERATURE", defaults.generation.temperature),
            top_p: parse_or("TOP_P", defaults.generation.top_p),
            stop_sequences,
        };

        let mode = match env::var("SELECTION_MODE") {
            Ok(s) if !s.trim().is_empty() => s.parse()?,
            _ => defaults.selection.mode,
        };
        let selection = SelectionConfig {
            mode,
            min_score: parse_or("SEMANTIC_MIN_SCORE", defaults.selection.min_score),
            max_results: parse_or("SEMANTIC_TOP_K", defaults.selection.max_results),
        };

        let debug_events = parse_or("CHAT_DEBUG_EVENTS", defaults.debug_events);
        let log_file = env::var("LOG_FILE").unwrap_or(defaults.log_file);

        Ok(Self {
            budgets,
            generation,
            selection,
            debug_events,
            log_file,
        })
    }

    /// Rejects inconsistent budgets and sampling parameters.
    pub fn validate(&self) -> Result<()> {
        let b = &self.budgets;
        if b.max_context_length == 0 || b.max_total_length == 0 || b.max_message_length == 0 {
            anyhow::bail!("Token budgets must be positive: {:?}", b);
        }
        if b.max_context_length > b.max_total_length {
            anyhow::bail!(
                "MAX_CONTEXT_LENGTH ({}) must not exceed MAX_TOTAL_LENGTH ({})",
                b.max_context_length,
                b.max_total_length
            );
        }
        if self.generation.max_new_tokens == 0 {
            anyhow::bail!("MAX_NEW_TOKENS must be positive");
        }
        if !(self.generation.temperature >= 0.0) {
            anyhow::bail!("TEMPERATURE must be >= 0, got {}", self.generation.temperature);
        }
        if !(self.generation.top_p > 0.0 && self.generation.top_p <= 1.0) {
            anyhow::bail!("TOP_P must be in (0, 1], got {}", self.generation.top_p);
        }
        if !(0.0..=1.0).contains(&self.selection.min_score) {
            anyhow::bail!(
                "SEMANTIC_MIN_SCORE must be in [0, 1], got {}",
                self.selection.min_score
            );
        }
        if self.selection.max_results == 0 {
            anyhow::bail!("SEMANTIC_TOP_K must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "MAX_CONTEXT_LENGTH",
        "MAX_TOTAL_LENGTH",
        "MAX_MESSAGE_LENGTH",
        "MAX_NEW_TOKENS",
        "TEMPERATURE",
        "TOP_P",
        "STOP_SEQUENCES",
        "SELECTION_MODE",
        "SEMANTIC_MIN_SCORE",
        "SEMANTIC_TOP_K",
        "CHAT_DEBUG_EVENTS",
        "LOG_FILE",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        clear_env();

        let config = ChatConfig::load().unwrap();

        assert_eq!(config, ChatConfig::default());
        assert_eq!(config.budgets.max_context_length, 256);
        assert_eq!(config.budgets.max_total_length, 1024);
        assert_eq!(config.budgets.max_message_length, 1024);
        assert_eq!(config.generation.max_new_tokens, 512);
        assert_eq!(config.selection.mode, SelectionMode::Budget);
        assert_eq!(config.selection.max_results, 3);
        assert!(!config.debug_events);
        assert_eq!(config.log_file, "logs/chat.log");
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn test_load_config_with_custom_values() {
        clear_env();
        env::set_var("MAX_CONTEXT_LENGTH", "128");
        env::set_var("MAX_TOTAL_LENGTH", "512");
        env::set_var("MAX_MESSAGE_LENGTH", "2048");
        env::set_var("TEMPERATURE", "0.2");
        env::set_var("STOP_SEQUENCES", "</s>, User:,,");
        env::set_var("SELECTION_MODE", "Semantic");
        env::set_var("SEMANTIC_MIN_SCORE", "0.5");
        env::set_var("SEMANTIC_TOP_K", "5");
        env::set_var("CHAT_DEBUG_EVENTS", "true");
        env::set_var("LOG_FILE", "/tmp/chat-test.log");

        let config = ChatConfig::load().unwrap();
        clear_env();

        assert_eq!(config.budgets.max_context_length, 128);
        assert_eq!(config.budgets.max_total_length, 512);
        assert_eq!(config.budgets.max_message_length, 2048);
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.generation.stop_sequences, vec!["</s>", "User:"]);
        assert_eq!(config.selection.mode, SelectionMode::Semantic);
        assert!((config.selection.min_score - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.selection.max_results, 5);
        assert!(config.debug_events);
        assert_eq!(config.log_file, "/tmp/chat-test.log");
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn test_unparsable_number_falls_back_to_default() {
        clear_env();
        env::set_var("MAX_CONTEXT_LENGTH", "lots");

        let config = ChatConfig::load().unwrap();
        clear_env();

        assert_eq!(config.budgets.max_context_length, 256);
    }

    #[test]
    #[serial]
    fn test_unknown_selection_mode_is_error() {
        clear_env();
        env::set_var("SELECTION_MODE", "random");

        let result = ChatConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_inconsistent_values() {
        let mut config = ChatConfig::default();
        config.budgets.max_context_length = 2048;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.budgets.max_message_length = 0;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.generation.top_p = 0.0;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.generation.temperature = -0.1;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.selection.min_score = 1.5;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.selection.max_results = 0;
        assert!(config.validate().is_err());
    }
}
