// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat turn pipeline.
//!
//! Each turn persists the user message before anything that can fail, so a
//! retrieval or LLM failure never loses what the user said.

use std::sync::Arc;

use futures::StreamExt;
use memora_config::model::{ChatConfig, RetrievalConfig};
use memora_core::{
    ChatMessage, ChatOptions, ChunkMatch, MemoraError, Message, Metadata, Role, Session,
    StorageAdapter,
};
use memora_memory::{MemoryStore, RetrieveOptions, Retriever};
use memora_router::LlmRouter;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::prompt::{assemble_prompt, message_text};

/// Per-turn options for [`ChatService::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct SendOptions {
    /// Explicit LLM provider; overrides the configured default.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub retrieval_k: usize,
    pub retrieval_threshold: f64,
    pub max_history: usize,
    pub include_global_memories: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default(), &ChatConfig::default())
    }
}

impl SendOptions {
    pub fn from_config(retrieval: &RetrievalConfig, chat: &ChatConfig) -> Self {
        Self {
            provider: None,
            model: None,
            retrieval_k: retrieval.k,
            retrieval_threshold: retrieval.similarity_threshold,
            max_history: chat.max_history,
            include_global_memories: retrieval.include_global,
        }
    }

    fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            provider: self.provider.clone(),
            model: self.model.clone(),
            ..ChatOptions::default()
        }
    }
}

/// Summary of a completed turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub session: Session,
    /// Retrieved chunks injected into the prompt.
    pub context_used: usize,
    /// Prior messages injected into the prompt.
    pub history_included: usize,
}

/// A message as returned by [`ChatService::get_conversation_history`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub role: Role,
    /// Primary text of the payload.
    pub text: String,
    pub created_at: String,
}

/// Everything a turn needs once the user message is stored.
struct PreparedTurn {
    session: Session,
    prompt: String,
    context: Vec<ChunkMatch>,
    history_included: usize,
}

/// Retrieval-augmented chat over persistent sessions.
pub struct ChatService {
    storage: Arc<dyn StorageAdapter>,
    memory: Arc<MemoryStore>,
    retriever: Arc<Retriever>,
    router: Arc<LlmRouter>,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        memory: Arc<MemoryStore>,
        retriever: Arc<Retriever>,
        router: Arc<LlmRouter>,
        config: ChatConfig,
    ) -> Self {
        Self {
            storage,
            memory,
            retriever,
            router,
            config,
        }
    }

    /// Turn options built from this service's configuration.
    pub fn default_options(&self) -> SendOptions {
        SendOptions::from_config(self.retriever.config(), &self.config)
    }

    /// Runs one retrieval-augmented turn and returns the assistant reply.
    ///
    /// 1. Resolves (or creates) the session by name
    /// 2. Persists the user message
    /// 3. Retrieves context chunks
    /// 4. Loads the most recent history, oldest first
    /// 5. Assembles the prompt
    /// 6. Sends it as a single user message through the router
    /// 7. Persists the assistant reply
    ///
    /// A failure in step 3 is `RetrievalFailed` and in step 6 `LlmFailed`;
    /// either way the user message from step 2 stays stored.
    pub async fn send_message(
        &self,
        text: &str,
        session_name: &str,
        options: SendOptions,
    ) -> Result<ChatReply, MemoraError> {
        let turn = self.prepare_turn(text, session_name, &options).await?;

        let envelope = self
            .router
            .chat(vec![ChatMessage::user(turn.prompt.as_str())], &options.chat_options())
            .await
            .map_err(llm_failed)?;
        let response = match envelope.first_content() {
            Some(content) if !content.trim().is_empty() => content.to_string(),
            _ => {
                return Err(MemoraError::LlmFailed {
                    reason: "provider returned no content".to_string(),
                });
            }
        };
        debug!(
            model = envelope.model.as_str(),
            prompt_tokens = envelope.usage.prompt_tokens,
            completion_tokens = envelope.usage.completion_tokens,
            "completion received"
        );

        self.finish_turn(turn, response).await
    }

    /// Like [`send_message`](Self::send_message), but streams the reply.
    ///
    /// Each piece is handed to `on_chunk` as it arrives; the stored reply is
    /// their concatenation. A provider without streaming support fails with
    /// `NotImplemented` after the user message has been stored.
    pub async fn stream_message<F>(
        &self,
        text: &str,
        session_name: &str,
        options: SendOptions,
        mut on_chunk: F,
    ) -> Result<ChatReply, MemoraError>
    where
        F: FnMut(&str) + Send,
    {
        let turn = self.prepare_turn(text, session_name, &options).await?;

        let mut stream = self
            .router
            .stream_chat(vec![ChatMessage::user(turn.prompt.as_str())], &options.chat_options())
            .await
            .map_err(llm_failed)?;
        let mut response = String::new();
        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(llm_failed)?;
            on_chunk(&piece);
            response.push_str(&piece);
        }
        if response.trim().is_empty() {
            return Err(MemoraError::LlmFailed {
                reason: "provider streamed no content".to_string(),
            });
        }

        self.finish_turn(turn, response).await
    }

    /// Steps 1 to 5 of a turn.
    async fn prepare_turn(
        &self,
        text: &str,
        session_name: &str,
        options: &SendOptions,
    ) -> Result<PreparedTurn, MemoraError> {
        if text.trim().is_empty() {
            return Err(MemoraError::validation("text", "must not be empty"));
        }

        let session = self
            .memory
            .get_or_create_session(session_name, &Metadata::new())
            .await?;

        let user_message = Message::text(&session.id, Role::User, text);
        self.storage.insert_message(&user_message).await?;
        debug!(session_id = %session.id, "persisted user message");

        let retrieve = RetrieveOptions {
            threshold: options.retrieval_threshold,
            include_global: options.include_global_memories,
        };
        let context = self
            .retriever
            .retrieve(text, Some(&session.id), options.retrieval_k, retrieve)
            .await
            .map_err(|e| {
                warn!(session_id = %session.id, error = %e, "retrieval failed");
                MemoraError::RetrievalFailed {
                    reason: e.to_string(),
                }
            })?;

        // One extra row so the message just stored can be dropped.
        let mut history = self
            .storage
            .get_recent_messages(&session.id, options.max_history.saturating_add(1))
            .await?;
        history.retain(|m| m.id != user_message.id);
        if history.len() > options.max_history {
            history.drain(..history.len() - options.max_history);
        }

        let prompt = assemble_prompt(&self.config.system_prompt, &context, &history, text);
        Ok(PreparedTurn {
            session,
            prompt,
            context,
            history_included: history.len(),
        })
    }

    /// Step 7: stores the reply and builds the summary.
    async fn finish_turn(
        &self,
        turn: PreparedTurn,
        response: String,
    ) -> Result<ChatReply, MemoraError> {
        let reply = Message::text(&turn.session.id, Role::Assistant, &response);
        self.storage.insert_message(&reply).await?;

        info!(
            session = turn.session.name.as_str(),
            context_used = turn.context.len(),
            history_included = turn.history_included,
            response_chars = response.chars().count(),
            "chat turn complete"
        );
        Ok(ChatReply {
            response,
            session: turn.session,
            context_used: turn.context.len(),
            history_included: turn.history_included,
        })
    }

    /// The most recent `max_history` messages of a session, oldest first.
    ///
    /// Unknown or empty sessions yield an empty list.
    pub async fn get_conversation_history(
        &self,
        session_id: &str,
        max_history: usize,
    ) -> Result<Vec<HistoryEntry>, MemoraError> {
        let messages = self
            .storage
            .get_recent_messages(session_id, max_history)
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| HistoryEntry {
                text: message_text(&m),
                id: m.id,
                role: m.role,
                created_at: m.created_at,
            })
            .collect())
    }

    /// Deletes every message in the named session. The session and its
    /// memories remain. Returns the number of messages removed.
    pub async fn clear_history(&self, session_name: &str) -> Result<u64, MemoraError> {
        let session = self.memory.find_session(session_name).await?;
        let removed = self
            .storage
            .delete_messages_for_session(&session.id)
            .await?;
        info!(session = session_name, removed, "conversation history cleared");
        Ok(removed)
    }
}

/// Tags a dispatch error as an LLM failure. Routing errors keep their own
/// tags so callers can tell a misconfiguration from a provider outage.
fn llm_failed(err: MemoraError) -> MemoraError {
    match err {
        MemoraError::LlmFailed { .. }
        | MemoraError::UnknownProvider { .. }
        | MemoraError::NotImplemented { .. } => err,
        other => MemoraError::LlmFailed {
            reason: other.to_string(),
        },
    }
}
