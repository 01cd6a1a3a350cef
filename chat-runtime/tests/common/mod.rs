//! Shared fakes for chat-runtime integration tests.
//!
//! Provides a word-counting Tokenizer, a scripted Generator (fixed chunks, optional load or
//! mid-stream failure, optional gate that parks the stream after its first chunk) and helpers
//! that wire a coordinator or a service around them.

use async_trait::async_trait;
use chat_runtime::{Capabilities, ChatConfig, ChatService, GenerationCoordinator};
use embedding::EmbeddingService;
use llm_client::{GenerationConfig, Generator, StreamChunk, StreamChunkCallback, Tokenizer};
use memory_core::{ContextStore, TokenBudgets};
use memory_strategies::BudgetFillStrategy;
use prompt::ChatMessage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, RwLock};

/// Counts whitespace-separated words.
#[allow(dead_code)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> anyhow::Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Embeds on "sky" / "food" / "code" keyword axes.
#[allow(dead_code)]
pub struct KeywordEmbedding;

#[async_trait]
impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        let lower = text.to_lowercase();
        Ok(["sky", "food", "code"]
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect())
    }
}

/// Generator that streams a fixed list of chunks.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedGenerator {
    chunks: Vec<String>,
    fail_after: Option<usize>,
    load_failure: Mutex<Option<String>>,
    load_gate: Option<Arc<Notify>>,
    stream_gate: Option<Arc<Notify>>,
    /// Signalled when a gated stream has delivered its first chunk.
    pub started: Arc<Notify>,
    pub load_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub last_messages: Mutex<Vec<ChatMessage>>,
}

#[allow(dead_code)]
impl ScriptedGenerator {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Fails after delivering `n` chunks.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// `load` waits for `gate` before succeeding.
    pub fn with_load_gate(mut self, gate: Arc<Notify>) -> Self {
        self.load_gate = Some(gate);
        self
    }

    /// After the first chunk, notifies `started` and waits for `gate`.
    pub fn with_stream_gate(mut self, gate: Arc<Notify>) -> Self {
        self.stream_gate = Some(gate);
        self
    }

    /// Next `load` calls fail with `message` until cleared with `None`.
    pub fn set_load_failure(&self, message: Option<&str>) {
        *self.load_failure.lock().unwrap() = message.map(String::from);
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }

    pub fn full_text(&self) -> String {
        self.chunks.concat()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn check(&self) -> anyhow::Result<String> {
        Ok("scripted generator".to_string())
    }

    async fn load(&self) -> anyhow::Result<()> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.load_gate {
            gate.notified().await;
        }
        let failure = self.load_failure.lock().unwrap().clone();
        match failure {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }

    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        _config: &GenerationConfig,
        callback: &mut StreamChunkCallback<'_>,
    ) -> anyhow::Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages;

        let mut output = String::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            if self.fail_after == Some(i) {
                return Err(anyhow::anyhow!("device lost mid-stream"));
            }
            callback(StreamChunk::text(chunk.clone()))?;
            output.push_str(chunk);
            if i == 0 {
                if let Some(gate) = &self.stream_gate {
                    self.started.notify_one();
                    gate.notified().await;
                }
            }
        }
        callback(StreamChunk::finished())?;
        Ok(output)
    }
}

#[allow(dead_code)]
pub fn budgets(max_context: usize, max_total: usize, max_message: usize) -> TokenBudgets {
    TokenBudgets {
        max_context_length: max_context,
        max_total_length: max_total,
        max_message_length: max_message,
    }
}

/// Coordinator with budget-fill selection over a fresh store.
#[allow(dead_code)]
pub fn coordinator(
    generator: Arc<ScriptedGenerator>,
    budgets: TokenBudgets,
) -> (GenerationCoordinator, Arc<RwLock<ContextStore>>) {
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(WordTokenizer);
    let store = Arc::new(RwLock::new(ContextStore::new(budgets, tokenizer.clone())));
    let coordinator = GenerationCoordinator::new(
        generator,
        tokenizer,
        Arc::new(BudgetFillStrategy::new(budgets.max_context_length)),
        store.clone(),
        budgets,
        GenerationConfig::default(),
    );
    (coordinator, store)
}

/// Service over `generator` with the word tokenizer and default config.
#[allow(dead_code)]
pub fn service(generator: Arc<ScriptedGenerator>) -> ChatService {
    service_with(generator, ChatConfig::default())
}

#[allow(dead_code)]
pub fn service_with(generator: Arc<ScriptedGenerator>, config: ChatConfig) -> ChatService {
    ChatService::new(
        &config,
        Capabilities {
            tokenizer: Arc::new(WordTokenizer),
            generator,
            embedder: Some(Arc::new(KeywordEmbedding)),
        },
    )
    .unwrap()
}

/// `n` space-separated words.
#[allow(dead_code)]
pub fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}
