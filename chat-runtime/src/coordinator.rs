//! Generation coordinator: owns the readiness state and the single in-flight generation.
//!
//! **Data flow:** [`GenerationCoordinator::begin`] (readiness + single-flight guard) →
//! [`GenerationPermit::run`] (snapshot contexts → relevance selection → history truncation →
//! prompt assembly → streamed generation, relaying every chunk to `on_update` in order).

use crate::error::CoordinatorError;
use crate::state::ReadinessState;
use llm_client::{GenerationConfig, Generator, StreamChunk, Tokenizer};
use memory_core::{ContextStore, TokenBudgets};
use memory_strategies::{truncate_history, RelevanceStrategy};
use prompt::{ChatMessage, MessageRole};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Result of a completed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    /// Full reply as reported by the generator.
    pub text: String,
    /// Number of non-empty chunks delivered to `on_update`.
    pub chunk_count: usize,
    /// Contexts injected into the prompt, in selection order.
    pub context_ids: Vec<String>,
    /// History messages kept after truncation (the synthesized system message excluded).
    pub history_len: usize,
}

struct Inner {
    generator: Arc<dyn Generator>,
    tokenizer: Arc<dyn Tokenizer>,
    strategy: Arc<dyn RelevanceStrategy>,
    store: Arc<RwLock<ContextStore>>,
    budgets: TokenBudgets,
    generation: GenerationConfig,
    state: watch::Sender<ReadinessState>,
    in_flight: AtomicBool,
}

/// Cheap to clone; all clones share one state and one in-flight slot.
#[derive(Clone)]
pub struct GenerationCoordinator {
    inner: Arc<Inner>,
}

impl GenerationCoordinator {
    pub fn new(
        generator: Arc<dyn Generator>,
        tokenizer: Arc<dyn Tokenizer>,
        strategy: Arc<dyn RelevanceStrategy>,
        store: Arc<RwLock<ContextStore>>,
        budgets: TokenBudgets,
        generation: GenerationConfig,
    ) -> Self {
        let (state, _) = watch::channel(ReadinessState::Idle);
        Self {
            inner: Arc::new(Inner {
                generator,
                tokenizer,
                strategy,
                store,
                budgets,
                generation,
                state,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.inner.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().is_ready()
    }

    /// Receiver that observes every readiness transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ReadinessState> {
        self.inner.state.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn strategy_name(&self) -> &str {
        self.inner.strategy.name()
    }

    /// Readiness probe; does not change state.
    pub async fn check(&self) -> Result<String, CoordinatorError> {
        self.inner
            .generator
            .check()
            .await
            .map_err(|e| CoordinatorError::Unavailable(e.to_string()))
    }

    /// Moves to `loading` and loads the model. From `error` or `ready` this restarts loading.
    ///
    /// If a load is already running no second load is issued; the call waits for the running
    /// one to settle and reports its outcome. A generation in flight is not interrupted and still
    /// resolves exactly once. Dropping this future mid-load settles the state as `error`.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), CoordinatorError> {
        let started = self.inner.state.send_if_modified(|s| {
            if *s == ReadinessState::Loading {
                false
            } else {
                *s = ReadinessState::Loading;
                true
            }
        });
        if !started {
            debug!("Load already in progress, waiting for it to settle");
            return self.wait_settled().await;
        }
        if self.is_generating() {
            warn!("Reloading while a generation is in flight; it will finish on the previous load");
        }

        let guard = LoadGuard {
            state: &self.inner.state,
            armed: true,
        };
        info!("Loading model");
        match self.inner.generator.load().await {
            Ok(()) => {
                guard.settle(ReadinessState::Ready);
                info!("Model ready");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "Model load failed");
                guard.settle(ReadinessState::Error(message.clone()));
                Err(CoordinatorError::Load(message))
            }
        }
    }

    async fn wait_settled(&self) -> Result<(), CoordinatorError> {
        let mut rx = self.subscribe_state();
        let settled = rx
            .wait_for(|s| s.is_settled())
            .await
            .map(|s| s.clone())
            .map_err(|_| CoordinatorError::Load("readiness state dropped".to_string()))?;
        match settled {
            ReadinessState::Ready => Ok(()),
            ReadinessState::Error(message) => Err(CoordinatorError::Load(message)),
            other => Err(CoordinatorError::NotReady(other)),
        }
    }

    /// Moves to `error` after a capability failure. A concurrent reload is left alone.
    pub fn mark_failed(&self, message: &str) {
        let changed = self.inner.state.send_if_modified(|s| {
            if *s == ReadinessState::Loading {
                false
            } else {
                *s = ReadinessState::Error(message.to_string());
                true
            }
        });
        if changed {
            error!(error = %message, "Capability failure, readiness state is now error");
        }
    }

    fn fail(&self, err: CoordinatorError) -> CoordinatorError {
        self.mark_failed(&err.to_string());
        err
    }

    /// Claims the single generation slot. Fails with `NotReady` unless the state is `ready`,
    /// then with `Busy` if another generation holds the slot. Never queues.
    pub fn begin(&self) -> Result<GenerationPermit, CoordinatorError> {
        let state = self.state();
        if !state.is_ready() {
            debug!(%state, "Generation rejected: not ready");
            return Err(CoordinatorError::NotReady(state));
        }
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Generation rejected: busy");
            return Err(CoordinatorError::Busy);
        }
        Ok(GenerationPermit {
            coordinator: self.clone(),
        })
    }

    /// `begin` followed by `run`.
    pub async fn generate<F>(
        &self,
        history: Vec<ChatMessage>,
        user_text: &str,
        on_update: F,
    ) -> Result<GenerationOutcome, CoordinatorError>
    where
        F: FnMut(&str) + Send,
    {
        self.begin()?.run(history, user_text, on_update).await
    }
}

/// Holds the in-flight slot; released on drop.
pub struct GenerationPermit {
    coordinator: GenerationCoordinator,
}

impl GenerationPermit {
    /// Builds the prompt and streams the reply. `on_update` is called once per non-empty chunk,
    /// in arrival order. On a mid-stream failure the chunks already delivered stay delivered and
    /// the state moves to `error`.
    #[instrument(skip(self, history, on_update), fields(history_len = history.len()))]
    pub async fn run<F>(
        self,
        history: Vec<ChatMessage>,
        user_text: &str,
        mut on_update: F,
    ) -> Result<GenerationOutcome, CoordinatorError>
    where
        F: FnMut(&str) + Send,
    {
        let coordinator = &self.coordinator;
        let inner = &coordinator.inner;

        let contexts = inner.store.read().await.list();
        let selection = inner
            .strategy
            .select(user_text, &contexts)
            .await
            .map_err(|e| coordinator.fail(CoordinatorError::Selection(e.to_string())))?;
        info!(
            strategy = inner.strategy.name(),
            candidates = contexts.len(),
            selected = selection.contexts.len(),
            context_tokens = selection.total_tokens(),
            "Contexts selected"
        );

        let history = with_user_turn(history, user_text);
        let truncated = truncate_history(
            &history,
            inner.budgets.max_message_length,
            inner.tokenizer.as_ref(),
        )
        .map_err(|e| coordinator.fail(CoordinatorError::Tokenizer(e.to_string())))?;
        let history_len = truncated.len();
        if history_len < history.len() {
            info!(
                kept = history_len,
                dropped = history.len() - history_len,
                max_tokens = inner.budgets.max_message_length,
                "History truncated to fit budget"
            );
        }

        let messages = prompt::assemble(truncated, &selection.text());
        info!(prompt_messages = messages.len(), "Starting generation");

        let mut chunk_count = 0usize;
        let mut relay = |chunk: StreamChunk| -> anyhow::Result<()> {
            if !chunk.content.is_empty() {
                chunk_count += 1;
                on_update(&chunk.content);
            }
            Ok(())
        };
        let result = inner
            .generator
            .generate(messages, &inner.generation, &mut relay)
            .await;

        match result {
            Ok(text) => {
                info!(chunk_count, output_len = text.len(), "Generation complete");
                Ok(GenerationOutcome {
                    text,
                    chunk_count,
                    context_ids: selection.context_ids(),
                    history_len,
                })
            }
            Err(e) => {
                error!(error = %e, chunk_count, "Generation failed mid-stream");
                Err(coordinator.fail(CoordinatorError::Generation(e.to_string())))
            }
        }
    }
}

impl Drop for GenerationPermit {
    fn drop(&mut self) {
        self.coordinator
            .inner
            .in_flight
            .store(false, Ordering::Release);
    }
}

/// Leaves `loading` for `error` if the load future is dropped before the generator answers,
/// so a later `initialize` starts a fresh load instead of waiting on one that will never settle.
struct LoadGuard<'a> {
    state: &'a watch::Sender<ReadinessState>,
    armed: bool,
}

impl LoadGuard<'_> {
    fn settle(mut self, state: ReadinessState) {
        self.armed = false;
        self.state.send_replace(state);
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Model load cancelled before it settled");
            self.state
                .send_replace(ReadinessState::Error(LOAD_CANCELLED.to_string()));
        }
    }
}

const LOAD_CANCELLED: &str = "load cancelled";

/// Appends `user_text` as a user turn unless the history already ends with it.
fn with_user_turn(mut history: Vec<ChatMessage>, user_text: &str) -> Vec<ChatMessage> {
    let already_last = history
        .last()
        .map(|m| m.role == MessageRole::User && m.content == user_text)
        .unwrap_or(false);
    if !already_last && !user_text.is_empty() {
        history.push(ChatMessage::user(user_text));
    }
    history
}
