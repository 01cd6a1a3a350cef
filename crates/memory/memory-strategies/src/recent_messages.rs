//! Recent-history truncation.

use llm_client::Tokenizer;
use prompt::ChatMessage;
use tracing::debug;

/// Keeps the longest suffix of `messages` whose token total is `<= max_tokens`.
///
/// Walks from the newest message backwards and stops at the first message that would overflow,
/// so the result is always a contiguous tail of the input in its original order.
pub fn truncate_history(
    messages: &[ChatMessage],
    max_tokens: usize,
    tokenizer: &dyn Tokenizer,
) -> Result<Vec<ChatMessage>, anyhow::Error> {
    let mut used = 0usize;
    let mut keep = 0usize;
    for message in messages.iter().rev() {
        let tokens = tokenizer.count_tokens(&message.content)?;
        if used + tokens > max_tokens {
            break;
        }
        used += tokens;
        keep += 1;
    }
    let start = messages.len() - keep;
    debug!(
        input = messages.len(),
        kept = keep,
        dropped = start,
        tokens_used = used,
        max_tokens,
        "History truncated"
    );
    Ok(messages[start..].to_vec())
}
