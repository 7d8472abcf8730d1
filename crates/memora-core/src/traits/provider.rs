// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-completion provider trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::MemoraError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatEnvelope, ChatMessage, ChatOptions};

/// Incremental content chunks from a streaming completion.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, MemoraError>> + Send>>;

/// Adapter for LLM chat-completion backends.
///
/// Each provider normalizes its native response into a [`ChatEnvelope`].
#[async_trait]
pub trait ChatProvider: PluginAdapter {
    /// Sends the messages and returns the full completion.
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        options: &ChatOptions,
    ) -> Result<ChatEnvelope, MemoraError>;

    /// Sends the messages and returns a stream of content chunks.
    ///
    /// Providers without streaming support keep the default, which fails
    /// immediately with [`MemoraError::NotImplemented`].
    async fn stream_chat(
        &self,
        _messages: Vec<ChatMessage>,
        _options: &ChatOptions,
    ) -> Result<ChatStream, MemoraError> {
        Err(MemoraError::NotImplemented {
            provider: self.name().to_string(),
            operation: "stream_chat",
        })
    }
}
