// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-message prompt assembly.
//!
//! A prompt has up to four blocks separated by blank lines:
//! the fixed preamble, a bulleted "Relevant context" block (omitted when
//! retrieval found nothing), a role-labelled "Conversation history" block
//! (omitted for a fresh session) and the new user turn.

use memora_core::{ChunkMatch, Message, Role};

/// Builds the prompt text sent to the provider as one user message.
pub fn assemble_prompt(
    preamble: &str,
    context: &[ChunkMatch],
    history: &[Message],
    user_text: &str,
) -> String {
    let mut blocks: Vec<String> = Vec::with_capacity(4);

    let preamble = preamble.trim();
    if !preamble.is_empty() {
        blocks.push(preamble.to_string());
    }

    if !context.is_empty() {
        let mut block = String::from("Relevant context:");
        for chunk in context {
            block.push_str("\n- ");
            block.push_str(chunk.text.trim());
        }
        blocks.push(block);
    }

    if !history.is_empty() {
        let mut block = String::from("Conversation history:");
        for message in history {
            block.push('\n');
            block.push_str(role_label(message.role));
            block.push_str(": ");
            block.push_str(&message_text(message));
        }
        blocks.push(block);
    }

    blocks.push(format!("User: {user_text}"));
    blocks.join("\n\n")
}

/// Primary text of a message, or its raw payload when it has none.
pub fn message_text(message: &Message) -> String {
    match message.primary_text() {
        Some(text) => text.to_string(),
        None => message.content.to_string(),
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "System",
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::Tool => "Tool",
    }
}
