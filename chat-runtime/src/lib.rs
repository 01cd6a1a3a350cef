//! # Chat runtime
//!
//! Local chat core built on the workspace crates: a [`GenerationCoordinator`] that owns model
//! readiness and a single in-flight generation, a [`ChatService`] that applies context commands
//! and dispatches generations, and a [`ChannelClient`] that correlates replies to requests.
//!
//! ```text
//! ChannelClient --Envelope--> ChatService --begin/run--> GenerationCoordinator
//!       ^                         |                          | select, truncate, assemble
//!       +--------Reply------------+                          v
//!                                                        Generator (stream)
//! ```

mod channel;
mod config;
mod coordinator;
mod error;
mod logger;
mod protocol;
mod service;
mod state;

pub use channel::{spawn_service, ChannelClient, GeneratedReply};
pub use config::{ChatConfig, SelectionConfig, SelectionMode};
pub use coordinator::{GenerationCoordinator, GenerationOutcome, GenerationPermit};
pub use error::{ChannelError, CoordinatorError, ErrorKind};
pub use logger::init_tracing;
pub use protocol::{Command, CorrelationId, DebugLevel, Envelope, Reply, ResponseData, Status};
pub use service::{Capabilities, ChatService};
pub use state::ReadinessState;
