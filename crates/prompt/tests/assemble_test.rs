//! Unit tests for `prompt::assemble`.
//!
//! Verifies that at most one synthesized system message is injected and that history is passed
//! through unchanged.

use prompt::{
    assemble, format_context_instruction, join_contexts, ChatMessage, MessageRole,
    CONTEXT_PREFIX, CONTEXT_SUFFIX,
};

fn history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::user("What colour is the sky?").with_id("m1"),
        ChatMessage::assistant("Usually blue.").with_id("m2"),
        ChatMessage::user("Why?").with_id("m3"),
    ]
}

/// **Test: Non-empty context prepends exactly one system message with the fixed wording.**
#[test]
fn assemble_prepends_context_system_message() {
    let out = assemble(history(), "The sky is blue");

    assert_eq!(out.len(), 4);
    assert_eq!(out[0].role, MessageRole::System);
    assert_eq!(
        out[0].content,
        "Consider this context:\n\nThe sky is blue\n\nRespond based on this context when relevant."
    );
    let ids: Vec<&str> = out[1..].iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
}

/// **Test: Empty context leaves history unchanged (no system message).**
#[test]
fn assemble_without_context_passes_history_through() {
    let input = history();
    let out = assemble(input.clone(), "");
    assert_eq!(out, input);
}

/// **Test: Whitespace-only context is still context; only an empty string skips injection.**
#[test]
fn assemble_whitespace_context_is_injected() {
    let out = assemble(history(), "   ");
    assert_eq!(out.len(), 4);
    assert_eq!(out[0].role, MessageRole::System);
    assert_eq!(out[0].content, format_context_instruction("   "));
}

/// **Test: Caller history is not modified by assembly.**
#[test]
fn assemble_does_not_touch_caller_history() {
    let stored = history();
    let _ = assemble(stored.clone(), "ctx");
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|m| m.role != MessageRole::System));
}

#[test]
fn join_contexts_uses_blank_line() {
    assert_eq!(join_contexts(["a", "b", "c"]), "a\n\nb\n\nc");
    assert_eq!(join_contexts(Vec::<String>::new()), "");
}

#[test]
fn context_instruction_wraps_text() {
    let s = format_context_instruction("X");
    assert!(s.starts_with(CONTEXT_PREFIX));
    assert!(s.ends_with(CONTEXT_SUFFIX));
}
