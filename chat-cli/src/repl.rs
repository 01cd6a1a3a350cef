//! Line-oriented chat loop over a [`ChannelClient`].

use anyhow::Result;
use chat_runtime::{ChannelClient, ChannelError};
use memory_core::NewContext;
use prompt::ChatMessage;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub const HELP: &str = "\
Commands:
  /add <id> <text>   store a context snippet
  /rm <id>           remove a context
  /clear             remove all contexts
  /list              show stored contexts, newest first
  /help              show this help
  /quit              exit
Anything else is sent as a chat message.";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Add { id: String, text: String },
    Remove(String),
    Clear,
    List,
    Help,
    Quit,
    Chat(String),
    Empty,
    /// Malformed slash command; carries the usage hint.
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        if !line.starts_with('/') {
            return ReplCommand::Chat(line.to_string());
        }
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };
        match cmd {
            "/add" => match rest.split_once(char::is_whitespace) {
                Some((id, text)) if !text.trim().is_empty() => ReplCommand::Add {
                    id: id.to_string(),
                    text: text.trim().to_string(),
                },
                _ => ReplCommand::Invalid("usage: /add <id> <text>".to_string()),
            },
            "/rm" if !rest.is_empty() => ReplCommand::Remove(rest.to_string()),
            "/rm" => ReplCommand::Invalid("usage: /rm <id>".to_string()),
            "/clear" => ReplCommand::Clear,
            "/list" => ReplCommand::List,
            "/help" => ReplCommand::Help,
            "/quit" | "/exit" => ReplCommand::Quit,
            other => ReplCommand::Invalid(format!("unknown command {} (try /help)", other)),
        }
    }
}

fn report(err: &ChannelError) {
    match err.kind() {
        Some(kind) => println!("error [{:?}]: {}", kind, err),
        None => println!("error: {}", err),
    }
}

/// Loads the model, then reads stdin until `/quit` or EOF. Chat history lives here and is
/// sent with every turn.
pub async fn run(client: ChannelClient) -> Result<()> {
    println!("Loading model...");
    client.load().await?;
    println!("Ready. {}", HELP);

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Invalid(hint) => println!("{}", hint),
            ReplCommand::Add { id, text } => {
                match client.add_context(NewContext::new(id.clone(), text)).await {
                    Ok(added) => println!(
                        "added {} ({} tokens, {} total)",
                        id, added.token_count, added.total_tokens
                    ),
                    Err(e) => report(&e),
                }
            }
            ReplCommand::Remove(id) => match client.remove_context(id).await {
                Ok(total) => println!("{} tokens stored", total),
                Err(e) => report(&e),
            },
            ReplCommand::Clear => match client.clear_contexts().await {
                Ok(total) => println!("{} tokens stored", total),
                Err(e) => report(&e),
            },
            ReplCommand::List => match client.list_contexts().await {
                Ok(contexts) if contexts.is_empty() => println!("(no contexts)"),
                Ok(contexts) => {
                    for c in contexts {
                        println!(
                            "{}  {:>4} tok  {}  {}",
                            c.id,
                            c.token_count,
                            c.created_at.format("%H:%M:%S"),
                            c.text
                        );
                    }
                }
                Err(e) => report(&e),
            },
            ReplCommand::Chat(text) => {
                history.push(ChatMessage::user(text.clone()));
                let result = client
                    .generate_with(history.clone(), text, |chunk| {
                        print!("{}", chunk);
                        let _ = std::io::stdout().flush();
                    })
                    .await;
                println!();
                match result {
                    Ok(reply) => {
                        if !reply.context_ids.is_empty() {
                            info!(contexts = ?reply.context_ids, "Reply used contexts");
                        }
                        history.push(ChatMessage::assistant(reply.output));
                    }
                    Err(e) => {
                        warn!(error = %e, "Chat turn failed");
                        history.pop();
                        report(&e);
                    }
                }
            }
        }
    }
    println!("Bye.");
    Ok(())
}
