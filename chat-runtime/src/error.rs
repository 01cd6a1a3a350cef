//! Error types for the chat runtime.
//!
//! [`CoordinatorError`] covers readiness and generation failures; [`ChannelError`] is what a
//! caller of the command channel sees. Both map onto the wire-level [`ErrorKind`].

use crate::state::ReadinessState;
use memory_core::ContextError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Machine-readable error category carried in `error` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ContextTooLong,
    TotalBudgetExceeded,
    DuplicateId,
    NotReady,
    Busy,
    /// Tokenizer, embedder or model failure; readiness moves to `error`.
    Capability,
}

impl ErrorKind {
    pub fn from_context_error(e: &ContextError) -> Self {
        match e {
            ContextError::ContextTooLong { .. } => ErrorKind::ContextTooLong,
            ContextError::TotalBudgetExceeded { .. } => ErrorKind::TotalBudgetExceeded,
            ContextError::DuplicateId(_) => ErrorKind::DuplicateId,
            ContextError::Tokenizer(_) | ContextError::Embedding(_) => ErrorKind::Capability,
        }
    }
}

/// Errors from the generation coordinator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("Model not ready (state: {0})")]
    NotReady(ReadinessState),

    #[error("A generation is already in flight")]
    Busy,

    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    #[error("Model load failed: {0}")]
    Load(String),

    #[error("Context selection failed: {0}")]
    Selection(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::NotReady(_) => ErrorKind::NotReady,
            CoordinatorError::Busy => ErrorKind::Busy,
            CoordinatorError::Unavailable(_)
            | CoordinatorError::Load(_)
            | CoordinatorError::Selection(_)
            | CoordinatorError::Tokenizer(_)
            | CoordinatorError::Generation(_) => ErrorKind::Capability,
        }
    }
}

/// Errors seen by a command channel caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    /// The core answered the request with an `error` reply.
    #[error("{message}")]
    Rejected { kind: ErrorKind, message: String },

    /// The service side is gone; no reply will arrive.
    #[error("Command channel closed")]
    Closed,

    /// Opt-in timeout elapsed before a terminal reply.
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    /// A terminal reply arrived whose payload does not match the request.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ChannelError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ChannelError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
