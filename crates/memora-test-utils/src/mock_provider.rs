// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat-completion provider for deterministic testing.
//!
//! `MockChatProvider` implements `ChatProvider` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::stream;

use memora_core::{
    AdapterType, ChatEnvelope, ChatMessage, ChatOptions, ChatProvider, ChatStream, HealthStatus,
    MemoraError, PluginAdapter, Usage,
};

use crate::lock;

/// A captured `(messages, options)` pair.
pub type CapturedRequest = (Vec<ChatMessage>, ChatOptions);

/// A mock LLM provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
pub struct MockChatProvider {
    name: String,
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CapturedRequest>>,
    failing: AtomicBool,
    streaming: bool,
}

impl MockChatProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            streaming: false,
        }
    }

    /// Pre-load the response queue.
    pub fn with_responses(self, responses: Vec<String>) -> Self {
        lock(&self.responses).extend(responses);
        self
    }

    /// Support `stream_chat`, delivering each response word by word.
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Make every call fail with `LlmFailed` until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn add_response(&self, text: impl Into<String>) {
        lock(&self.responses).push_back(text.into());
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        lock(&self.requests).clone()
    }

    fn record(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<(), MemoraError> {
        lock(&self.requests).push((messages.to_vec(), options.clone()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(MemoraError::LlmFailed {
                reason: format!("{} is unavailable", self.name),
            });
        }
        Ok(())
    }

    fn next_response(&self) -> String {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

#[async_trait]
impl PluginAdapter for MockChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, MemoraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MemoraError> {
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        options: &ChatOptions,
    ) -> Result<ChatEnvelope, MemoraError> {
        self.record(&messages, options)?;
        let text = self.next_response();
        let prompt_tokens = messages
            .iter()
            .map(|m| m.content.split_whitespace().count() as u32)
            .sum::<u32>();
        let completion_tokens = text.split_whitespace().count() as u32;
        Ok(ChatEnvelope::single(
            options.model.clone().unwrap_or_else(|| "mock-model".to_string()),
            text,
            Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        ))
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        options: &ChatOptions,
    ) -> Result<ChatStream, MemoraError> {
        if !self.streaming {
            return Err(MemoraError::NotImplemented {
                provider: self.name.clone(),
                operation: "stream_chat",
            });
        }
        self.record(&messages, options)?;
        let text = self.next_response();
        let words: Vec<String> = text.split_inclusive(' ').map(str::to_string).collect();
        Ok(Box::pin(stream::iter(words.into_iter().map(Ok))))
    }
}
