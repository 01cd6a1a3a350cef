//! # chat-cli
//!
//! `chat` binary: argument parsing, loopback backend wiring and the interactive REPL.

pub mod cli;
pub mod loopback;
pub mod repl;

pub use cli::{build_service, Cli, Commands};
pub use loopback::{EchoGenerator, HashEmbedding};
