//! Model readiness state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `idle -> loading -> ready`, with `error` reachable from any state. Only an explicit
/// load leaves `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ReadinessState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

impl ReadinessState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessState::Ready)
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ReadinessState::Loading)
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessState::Idle => write!(f, "idle"),
            ReadinessState::Loading => write!(f, "loading"),
            ReadinessState::Ready => write!(f, "ready"),
            ReadinessState::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}
