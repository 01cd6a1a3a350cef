//! Chat service: consumes command envelopes and answers each with exactly one terminal reply.
//!
//! Context mutations are applied inline in the receive loop, so the loop is the single writer
//! of the context store. `check`, `load` and `generate` run in spawned tasks so a long
//! generation never blocks `context.list` or a second (rejected) `generate`.

use crate::config::{ChatConfig, SelectionMode};
use crate::coordinator::GenerationCoordinator;
use crate::error::ErrorKind;
use crate::protocol::{
    Command, CorrelationId, DebugLevel, Envelope, Reply, ResponseData, Status,
};
use embedding::EmbeddingService;
use llm_client::{Generator, Tokenizer};
use memory_core::{ContextStore, NewContext};
use memory_strategies::{BudgetFillStrategy, RelevanceStrategy, SemanticSearchStrategy};
use prompt::ChatMessage;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Inference backend handed to the service. The embedder is required for semantic selection.
#[derive(Clone)]
pub struct Capabilities {
    pub tokenizer: Arc<dyn Tokenizer>,
    pub generator: Arc<dyn Generator>,
    pub embedder: Option<Arc<dyn EmbeddingService>>,
}

/// Outbound reply sender with optional `debug` mirroring.
#[derive(Clone)]
struct Replies {
    tx: mpsc::UnboundedSender<Reply>,
    debug_events: bool,
}

impl Replies {
    fn send(&self, reply: Reply) {
        if self.tx.send(reply).is_err() {
            debug!("Reply dropped: caller side closed");
        }
    }

    fn status(&self, id: CorrelationId, status: Status) {
        self.send(Reply::new(id, status));
    }

    fn debug(&self, id: CorrelationId, level: DebugLevel, message: &str, details: serde_json::Value) {
        if self.debug_events {
            self.status(
                id,
                Status::Debug {
                    level,
                    message: message.to_string(),
                    details,
                },
            );
        }
    }
}

pub struct ChatService {
    coordinator: GenerationCoordinator,
    store: Arc<RwLock<ContextStore>>,
    debug_events: bool,
}

impl ChatService {
    /// Wires store, strategy and coordinator from config. Fails when semantic selection is
    /// configured without an embedder.
    pub fn new(config: &ChatConfig, capabilities: Capabilities) -> anyhow::Result<Self> {
        let mut store = ContextStore::new(config.budgets, capabilities.tokenizer.clone());
        let strategy: Arc<dyn RelevanceStrategy> = match config.selection.mode {
            SelectionMode::Semantic => {
                let embedder = capabilities.embedder.clone().ok_or_else(|| {
                    anyhow::anyhow!("SELECTION_MODE=semantic requires an embedding capability")
                })?;
                store = store.with_embedder(embedder.clone());
                Arc::new(SemanticSearchStrategy::new(
                    config.selection.max_results,
                    embedder,
                    config.selection.min_score,
                ))
            }
            SelectionMode::Budget => {
                Arc::new(BudgetFillStrategy::new(config.budgets.max_context_length))
            }
        };
        let store = Arc::new(RwLock::new(store));
        let coordinator = GenerationCoordinator::new(
            capabilities.generator,
            capabilities.tokenizer,
            strategy,
            store.clone(),
            config.budgets,
            config.generation.clone(),
        );
        info!(
            strategy = coordinator.strategy_name(),
            max_context_length = config.budgets.max_context_length,
            max_total_length = config.budgets.max_total_length,
            max_message_length = config.budgets.max_message_length,
            "Chat service created"
        );
        Ok(Self {
            coordinator,
            store,
            debug_events: config.debug_events,
        })
    }

    pub fn coordinator(&self) -> &GenerationCoordinator {
        &self.coordinator
    }

    /// Runs until the command sender is dropped. Spawned tasks keep answering their own
    /// requests after the loop exits.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<Envelope>,
        replies: mpsc::UnboundedSender<Reply>,
    ) {
        let replies = Replies {
            tx: replies,
            debug_events: self.debug_events,
        };
        info!("Chat service running");
        while let Some(envelope) = commands.recv().await {
            debug!(id = %envelope.id, command = envelope.command.name(), "Command received");
            self.dispatch(envelope, &replies).await;
        }
        info!("Command channel closed, chat service stopping");
    }

    async fn dispatch(&self, envelope: Envelope, replies: &Replies) {
        let Envelope { id, command } = envelope;
        match command {
            Command::Check => self.handle_check(id, replies),
            Command::Load => self.handle_load(id, replies),
            Command::Generate {
                messages,
                user_text,
            } => self.handle_generate(id, messages, user_text, replies),
            Command::ContextAdd(new) => self.handle_context_add(id, new, replies).await,
            Command::ContextRemove { id: context_id } => {
                let totals = self.store.write().await.remove(&context_id);
                replies.send(Reply::success(
                    id,
                    ResponseData::ContextTotals {
                        total_tokens: totals.total_tokens,
                    },
                ));
            }
            Command::ContextClear => {
                let totals = self.store.write().await.clear();
                replies.send(Reply::success(
                    id,
                    ResponseData::ContextTotals {
                        total_tokens: totals.total_tokens,
                    },
                ));
            }
            Command::ContextList => {
                let contexts = self.store.read().await.list();
                replies.send(Reply::success(id, ResponseData::ContextList { contexts }));
            }
        }
    }

    fn handle_check(&self, id: CorrelationId, replies: &Replies) {
        let coordinator = self.coordinator.clone();
        let replies = replies.clone();
        tokio::spawn(async move {
            let reply = match coordinator.check().await {
                Ok(detail) => Reply::success(id, ResponseData::Check { detail }),
                Err(e) => {
                    warn!(error = %e, "Readiness probe failed");
                    Reply::error(id, e.kind(), e.to_string())
                }
            };
            replies.send(reply);
        });
    }

    fn handle_load(&self, id: CorrelationId, replies: &Replies) {
        let coordinator = self.coordinator.clone();
        let replies = replies.clone();
        replies.status(id, Status::Loading);
        tokio::spawn(async move {
            let reply = match coordinator.initialize().await {
                Ok(()) => Reply::new(id, Status::Ready),
                Err(e) => Reply::error(id, e.kind(), e.to_string()),
            };
            replies.send(reply);
        });
    }

    fn handle_generate(
        &self,
        id: CorrelationId,
        messages: Vec<ChatMessage>,
        user_text: String,
        replies: &Replies,
    ) {
        let permit = match self.coordinator.begin() {
            Ok(permit) => permit,
            Err(e) => {
                replies.send(Reply::error(id, e.kind(), e.to_string()));
                return;
            }
        };
        replies.debug(
            id,
            DebugLevel::Info,
            "Generation accepted",
            json!({ "historyLen": messages.len(), "userTextLen": user_text.len() }),
        );
        let replies = replies.clone();
        tokio::spawn(async move {
            let updates = replies.clone();
            let result = permit
                .run(messages, &user_text, move |chunk| {
                    updates.status(
                        id,
                        Status::Update {
                            output: chunk.to_string(),
                        },
                    );
                })
                .await;
            match result {
                Ok(outcome) => {
                    replies.debug(
                        id,
                        DebugLevel::Info,
                        "Generation complete",
                        json!({
                            "chunks": outcome.chunk_count,
                            "contextIds": outcome.context_ids,
                            "historyLen": outcome.history_len,
                        }),
                    );
                    replies.send(Reply::success(
                        id,
                        ResponseData::Generated {
                            output: outcome.text,
                            context_ids: outcome.context_ids,
                        },
                    ));
                }
                Err(e) => replies.send(Reply::error(id, e.kind(), e.to_string())),
            }
        });
    }

    async fn handle_context_add(&self, id: CorrelationId, new: NewContext, replies: &Replies) {
        if !self.coordinator.is_ready() {
            let state = self.coordinator.state();
            replies.send(Reply::error(
                id,
                ErrorKind::NotReady,
                format!("Model not ready (state: {})", state),
            ));
            return;
        }
        let context_id = new.id.clone();
        let result = self.store.write().await.add(new).await;
        match result {
            Ok(added) => {
                replies.debug(
                    id,
                    DebugLevel::Debug,
                    "Context added",
                    json!({ "id": context_id, "tokenCount": added.token_count }),
                );
                replies.send(Reply::success(
                    id,
                    ResponseData::ContextAdded {
                        id: context_id,
                        token_count: added.token_count,
                        total_tokens: added.total_tokens,
                    },
                ));
            }
            Err(e) => {
                if e.is_capability_failure() {
                    self.coordinator.mark_failed(&e.to_string());
                }
                replies.send(Reply::error(
                    id,
                    ErrorKind::from_context_error(&e),
                    e.to_string(),
                ));
            }
        }
    }
}
