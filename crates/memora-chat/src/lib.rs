// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval-augmented chat orchestration for the Memora RAG backend.
//!
//! [`ChatService`] sequences one conversational turn: session resolution,
//! user message persistence, retrieval, history loading, prompt assembly,
//! LLM dispatch through the router and reply persistence.

pub mod prompt;
pub mod service;

pub use prompt::assemble_prompt;
pub use service::{ChatReply, ChatService, HistoryEntry, SendOptions};
