//! Loopback backend: lets the REPL run end to end without model weights.
//!
//! [`EchoGenerator`] streams the latest user message back word by word; [`HashEmbedding`]
//! hashes words into a fixed number of buckets so semantic selection has something to rank.

use async_trait::async_trait;
use embedding::EmbeddingService;
use llm_client::{GenerationConfig, Generator, StreamChunk, StreamChunkCallback};
use prompt::{ChatMessage, MessageRole};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Echoes the last user message, one word per chunk.
#[derive(Default)]
pub struct EchoGenerator {
    loaded: AtomicBool,
    chunk_delay: Duration,
}

impl EchoGenerator {
    pub fn new(chunk_delay: Duration) -> Self {
        Self {
            loaded: AtomicBool::new(false),
            chunk_delay,
        }
    }

    fn reply_for(messages: &[ChatMessage]) -> String {
        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let with_context = messages
            .first()
            .map(|m| m.role == MessageRole::System)
            .unwrap_or(false);
        if with_context {
            format!("(with context) You said: {}", question)
        } else {
            format!("You said: {}", question)
        }
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn check(&self) -> anyhow::Result<String> {
        Ok("loopback echo generator (no device required)".to_string())
    }

    async fn load(&self) -> anyhow::Result<()> {
        self.loaded.store(true, Ordering::Release);
        info!("Loopback generator loaded");
        Ok(())
    }

    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        config: &GenerationConfig,
        callback: &mut StreamChunkCallback<'_>,
    ) -> anyhow::Result<String> {
        if !self.loaded.load(Ordering::Acquire) {
            anyhow::bail!("loopback generator not loaded");
        }
        let reply = Self::reply_for(&messages);
        let reply = config.truncate_at_stop(&reply).unwrap_or(reply.as_str());

        let mut output = String::new();
        for word in reply.split_inclusive(' ').take(config.max_new_tokens) {
            if !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
            callback(StreamChunk::text(word))?;
            output.push_str(word);
        }
        callback(StreamChunk::finished())?;
        debug!(output_len = output.len(), "Loopback generation finished");
        Ok(output)
    }
}

/// Hashed bag-of-words embedding.
pub struct HashEmbedding {
    dimensions: usize,
}

impl HashEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }
        v
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Ok(self.vector(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedding::cosine_similarity;

    async fn run(
        generator: &EchoGenerator,
        messages: Vec<ChatMessage>,
        config: &GenerationConfig,
    ) -> (Vec<String>, String) {
        let mut chunks = Vec::new();
        let mut cb = |chunk: StreamChunk| -> anyhow::Result<()> {
            if !chunk.done {
                chunks.push(chunk.content);
            }
            Ok(())
        };
        let text = generator.generate(messages, config, &mut cb).await.unwrap();
        (chunks, text)
    }

    #[tokio::test]
    async fn echo_streams_words_in_order() {
        let generator = EchoGenerator::default();
        generator.load().await.unwrap();

        let (chunks, text) = run(
            &generator,
            vec![ChatMessage::user("the sky is blue")],
            &GenerationConfig::default(),
        )
        .await;

        assert_eq!(text, "You said: the sky is blue");
        assert_eq!(chunks.concat(), text);
        assert_eq!(chunks[0], "You ");
        assert_eq!(chunks.last().unwrap(), "blue");
    }

    #[tokio::test]
    async fn echo_marks_context_and_honours_stop_sequences() {
        let generator = EchoGenerator::default();
        generator.load().await.unwrap();
        let config = GenerationConfig {
            stop_sequences: vec![" is".to_string()],
            ..Default::default()
        };

        let (_, text) = run(
            &generator,
            vec![ChatMessage::system("ctx"), ChatMessage::user("sky is blue")],
            &config,
        )
        .await;

        assert_eq!(text, "(with context) You said: sky");
    }

    #[tokio::test]
    async fn echo_requires_load() {
        let generator = EchoGenerator::default();
        let mut cb = |_: StreamChunk| -> anyhow::Result<()> { Ok(()) };
        let result = generator
            .generate(vec![ChatMessage::user("hi")], &GenerationConfig::default(), &mut cb)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn hash_embedding_ranks_shared_words_higher() {
        let e = HashEmbedding::default();
        let query = e.embed("what colour is the sky").await.unwrap();
        let near = e.embed("The sky is blue").await.unwrap();
        let far = e.embed("pasta recipes").await.unwrap();

        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
        assert_eq!(near.len(), 256);
    }
}
