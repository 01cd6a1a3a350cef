//! Caller side of the command channel.
//!
//! [`ChannelClient`] tags each command with a fresh [`CorrelationId`], parks a oneshot in the
//! pending map, and a router task matches replies back by id. Terminal replies (`ready`,
//! `success`, `error`) resolve and remove the entry, so each request resolves exactly once no
//! matter how replies from different requests interleave. `update` replies are forwarded to the
//! request's stream while it is pending.
//!
//! `request` has no timeout; use `request_with_timeout` to bound the wait. When the service side
//! goes away, every pending request resolves with [`ChannelError::Closed`].

use crate::error::ChannelError;
use crate::protocol::{Command, CorrelationId, DebugLevel, Envelope, Reply, ResponseData, Status};
use crate::service::ChatService;
use memory_core::{Context, ContextAdded, NewContext};
use prompt::ChatMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands buffered between client and service before `send` waits.
const COMMAND_BUFFER: usize = 64;

type Outcome = Result<Status, ChannelError>;

struct PendingRequest {
    updates: Option<mpsc::UnboundedSender<String>>,
    done: oneshot::Sender<Outcome>,
}

#[derive(Default)]
struct PendingTable {
    requests: HashMap<CorrelationId, PendingRequest>,
    closed: bool,
}

/// Final payload of a successful `generate`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub output: String,
    pub context_ids: Vec<String>,
}

/// Cloneable handle; all clones share one id sequence and one pending table.
#[derive(Clone)]
pub struct ChannelClient {
    next_id: Arc<AtomicU64>,
    commands: mpsc::Sender<Envelope>,
    pending: Arc<Mutex<PendingTable>>,
}

/// Starts `service` on its own task and returns a connected client plus the service handle.
/// The service stops once every client clone is dropped.
pub fn spawn_service(service: ChatService) -> (ChannelClient, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(service.run(command_rx, reply_tx));
    (ChannelClient::new(command_tx, reply_rx), handle)
}

impl ChannelClient {
    /// Wraps raw channel ends and spawns the reply router.
    pub fn new(commands: mpsc::Sender<Envelope>, replies: mpsc::UnboundedReceiver<Reply>) -> Self {
        let pending = Arc::new(Mutex::new(PendingTable::default()));
        tokio::spawn(route_replies(replies, pending.clone()));
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            commands,
            pending,
        }
    }

    /// Number of requests still waiting for a terminal reply.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.requests.len()
    }

    async fn submit(
        &self,
        command: Command,
        updates: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<(CorrelationId, oneshot::Receiver<Outcome>), ChannelError> {
        let id = CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut table = self.pending.lock().await;
            if table.closed {
                return Err(ChannelError::Closed);
            }
            table.requests.insert(
                id,
                PendingRequest {
                    updates,
                    done: done_tx,
                },
            );
        }
        debug!(%id, command = command.name(), "Sending command");
        if self.commands.send(Envelope { id, command }).await.is_err() {
            self.pending.lock().await.requests.remove(&id);
            return Err(ChannelError::Closed);
        }
        Ok((id, done_rx))
    }

    /// Sends `command` and waits for its terminal reply. An `error` reply becomes
    /// [`ChannelError::Rejected`].
    pub async fn request(&self, command: Command) -> Result<Status, ChannelError> {
        let (_, done) = self.submit(command, None).await?;
        settle(done.await)
    }

    /// Like [`request`](Self::request) but gives up after `timeout`. The pending entry is
    /// discarded, so a reply arriving later is dropped by the router.
    pub async fn request_with_timeout(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<Status, ChannelError> {
        let (id, done) = self.submit(command, None).await?;
        match tokio::time::timeout(timeout, done).await {
            Ok(result) => settle(result),
            Err(_) => {
                self.pending.lock().await.requests.remove(&id);
                warn!(%id, ?timeout, "Request timed out");
                Err(ChannelError::Timeout(timeout))
            }
        }
    }

    pub async fn check(&self) -> Result<String, ChannelError> {
        match self.request(Command::Check).await? {
            Status::Success {
                data: ResponseData::Check { detail },
            } => Ok(detail),
            other => Err(unexpected(other)),
        }
    }

    /// Loads the model; resolves when the state settles to `ready`.
    pub async fn load(&self) -> Result<(), ChannelError> {
        match self.request(Command::Load).await? {
            Status::Ready => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn add_context(&self, context: NewContext) -> Result<ContextAdded, ChannelError> {
        match self.request(Command::ContextAdd(context)).await? {
            Status::Success {
                data:
                    ResponseData::ContextAdded {
                        token_count,
                        total_tokens,
                        ..
                    },
            } => Ok(ContextAdded {
                token_count,
                total_tokens,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the new total. Removing an unknown id is not an error.
    pub async fn remove_context(&self, id: impl Into<String>) -> Result<usize, ChannelError> {
        self.totals(Command::ContextRemove { id: id.into() }).await
    }

    pub async fn clear_contexts(&self) -> Result<usize, ChannelError> {
        self.totals(Command::ContextClear).await
    }

    async fn totals(&self, command: Command) -> Result<usize, ChannelError> {
        match self.request(command).await? {
            Status::Success {
                data: ResponseData::ContextTotals { total_tokens },
            } => Ok(total_tokens),
            other => Err(unexpected(other)),
        }
    }

    /// Stored contexts, newest first.
    pub async fn list_contexts(&self) -> Result<Vec<Context>, ChannelError> {
        match self.request(Command::ContextList).await? {
            Status::Success {
                data: ResponseData::ContextList { contexts },
            } => Ok(contexts),
            other => Err(unexpected(other)),
        }
    }

    pub async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        user_text: impl Into<String>,
    ) -> Result<GeneratedReply, ChannelError> {
        self.generate_with(messages, user_text, |_| {}).await
    }

    /// Streams a reply, calling `on_update` for each chunk in order before returning the
    /// final payload. On failure the chunks already passed to `on_update` stand.
    pub async fn generate_with<F>(
        &self,
        messages: Vec<ChatMessage>,
        user_text: impl Into<String>,
        mut on_update: F,
    ) -> Result<GeneratedReply, ChannelError>
    where
        F: FnMut(&str),
    {
        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
        let command = Command::Generate {
            messages,
            user_text: user_text.into(),
        };
        let (_, mut done) = self.submit(command, Some(updates_tx)).await?;

        let outcome = loop {
            tokio::select! {
                biased;
                Some(chunk) = updates_rx.recv() => on_update(&chunk),
                result = &mut done => break settle(result),
            }
        };
        // The router forwards every update before the terminal reply.
        while let Ok(chunk) = updates_rx.try_recv() {
            on_update(&chunk);
        }

        match outcome? {
            Status::Success {
                data:
                    ResponseData::Generated {
                        output,
                        context_ids,
                    },
            } => Ok(GeneratedReply {
                output,
                context_ids,
            }),
            other => Err(unexpected(other)),
        }
    }
}

fn settle(result: Result<Outcome, oneshot::error::RecvError>) -> Outcome {
    match result {
        Ok(Ok(Status::Error { kind, message })) => Err(ChannelError::Rejected { kind, message }),
        Ok(outcome) => outcome,
        Err(_) => Err(ChannelError::Closed),
    }
}

fn unexpected(status: Status) -> ChannelError {
    ChannelError::UnexpectedReply(format!("{:?}", status))
}

/// Matches replies to pending requests until the service side closes, then fails whatever is
/// still pending with `Closed`.
async fn route_replies(
    mut replies: mpsc::UnboundedReceiver<Reply>,
    pending: Arc<Mutex<PendingTable>>,
) {
    while let Some(Reply { id, status }) = replies.recv().await {
        let mut table = pending.lock().await;
        if status.is_terminal() {
            match table.requests.remove(&id) {
                Some(request) => {
                    if request.done.send(Ok(status)).is_err() {
                        debug!(%id, "Caller stopped waiting before the reply arrived");
                    }
                }
                None => warn!(%id, "Dropping terminal reply for unknown or expired request"),
            }
            continue;
        }
        match status {
            Status::Update { output } => match table.requests.get(&id) {
                Some(PendingRequest {
                    updates: Some(tx), ..
                }) => {
                    let _ = tx.send(output);
                }
                Some(_) => debug!(%id, "Update for a request without a stream"),
                None => warn!(%id, "Dropping update for unknown or expired request"),
            },
            Status::Loading => debug!(%id, "Model loading"),
            Status::Debug {
                level,
                message,
                details,
            } => match level {
                DebugLevel::Warn | DebugLevel::Error => {
                    warn!(%id, %details, "Service: {}", message)
                }
                DebugLevel::Debug | DebugLevel::Info => {
                    debug!(%id, %details, "Service: {}", message)
                }
            },
            Status::Ready | Status::Success { .. } | Status::Error { .. } => {}
        }
    }

    let mut table = pending.lock().await;
    table.closed = true;
    let orphaned = table.requests.len();
    for (_, request) in table.requests.drain() {
        let _ = request.done.send(Err(ChannelError::Closed));
    }
    info!(orphaned, "Reply channel closed");
}
