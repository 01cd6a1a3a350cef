//! Wire vocabulary of the command channel.
//!
//! Commands are JSON objects tagged by `type`; replies are tagged by `status`. Every reply
//! carries the [`CorrelationId`] (`messageId`) of the request it answers, and that id is the only thing used
//! to match them, so replies may arrive in any order across requests.

use crate::error::ErrorKind;
use memory_core::{Context, NewContext};
use prompt::ChatMessage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-chosen id, unique among outstanding requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commands accepted by the chat service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Readiness probe of the generation capability.
    #[serde(rename = "check")]
    Check,
    /// Load the model; answered by `ready` or `error`.
    #[serde(rename = "load")]
    Load,
    /// Stream a reply: `update` replies, then `success` or `error`.
    #[serde(rename = "generate")]
    Generate {
        messages: Vec<ChatMessage>,
        #[serde(rename = "userText")]
        user_text: String,
    },
    #[serde(rename = "context.add")]
    ContextAdd(NewContext),
    #[serde(rename = "context.remove")]
    ContextRemove { id: String },
    #[serde(rename = "context.clear")]
    ContextClear,
    #[serde(rename = "context.list")]
    ContextList,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Check => "check",
            Command::Load => "load",
            Command::Generate { .. } => "generate",
            Command::ContextAdd(_) => "context.add",
            Command::ContextRemove { .. } => "context.remove",
            Command::ContextClear => "context.clear",
            Command::ContextList => "context.list",
        }
    }
}

/// A command paired with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "messageId")]
    pub id: CorrelationId,
    #[serde(flatten)]
    pub command: Command,
}

/// Severity of a `debug` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Payload of a `success` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseData {
    Check {
        detail: String,
    },
    Generated {
        output: String,
        #[serde(rename = "contextIds")]
        context_ids: Vec<String>,
    },
    ContextAdded {
        id: String,
        #[serde(rename = "tokenCount")]
        token_count: usize,
        #[serde(rename = "totalTokens")]
        total_tokens: usize,
    },
    ContextTotals {
        #[serde(rename = "totalTokens")]
        total_tokens: usize,
    },
    ContextList {
        contexts: Vec<Context>,
    },
}

/// Reply status. `ready`, `success` and `error` are terminal: exactly one per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Status {
    Ready,
    Loading,
    Update {
        output: String,
    },
    Debug {
        level: DebugLevel,
        message: String,
        #[serde(default)]
        details: serde_json::Value,
    },
    Success {
        data: ResponseData,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Ready | Status::Success { .. } | Status::Error { .. })
    }
}

/// A status tagged with the id of the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "messageId")]
    pub id: CorrelationId,
    #[serde(flatten)]
    pub status: Status,
}

impl Reply {
    pub fn new(id: CorrelationId, status: Status) -> Self {
        Self { id, status }
    }

    pub fn error(id: CorrelationId, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(
            id,
            Status::Error {
                kind,
                message: message.into(),
            },
        )
    }

    pub fn success(id: CorrelationId, data: ResponseData) -> Self {
        Self::new(id, Status::Success { data })
    }
}
