// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;

use crate::error::MemoraError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChunkMatch, ChunkSearch, Memory, MemoryChunk, Message, Metadata, Session};

/// Adapter for the persistent store.
///
/// The store is the only shared mutable resource in the system. Every
/// method is a single-entity write or a single transaction.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), MemoraError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), MemoraError>;

    // --- Sessions ---

    async fn create_session(&self, session: &Session) -> Result<(), MemoraError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, MemoraError>;

    async fn get_session_by_name(&self, name: &str) -> Result<Option<Session>, MemoraError>;

    /// Returns the session named `name`, creating it with `metadata` if it
    /// does not exist. An existing session is returned unchanged.
    async fn get_or_create_session(
        &self,
        name: &str,
        metadata: &Metadata,
    ) -> Result<Session, MemoraError>;

    async fn list_sessions(&self) -> Result<Vec<Session>, MemoraError>;

    /// Deletes a session and its messages. Memories owned by the session
    /// become global. Returns `false` if no such session existed.
    async fn delete_session(&self, id: &str) -> Result<bool, MemoraError>;

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), MemoraError>;

    /// Returns at most `limit` of the newest messages, oldest first.
    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, MemoraError>;

    async fn count_messages(&self, session_id: &str) -> Result<u64, MemoraError>;

    /// Deletes every message in a session, returning how many were removed.
    async fn delete_messages_for_session(&self, session_id: &str) -> Result<u64, MemoraError>;

    // --- Memories and chunks ---

    /// Inserts a memory and all of its chunks in one transaction.
    async fn insert_memory_with_chunks(
        &self,
        memory: &Memory,
        chunks: &[MemoryChunk],
    ) -> Result<(), MemoraError>;

    async fn get_memory(&self, id: &str) -> Result<Option<Memory>, MemoraError>;

    /// Lists memories newest first, owned by `session_id` or global when `None`.
    async fn list_memories(&self, session_id: Option<&str>) -> Result<Vec<Memory>, MemoraError>;

    /// Deletes a memory and its chunks. Returns `false` if it did not exist.
    async fn delete_memory(&self, id: &str) -> Result<bool, MemoraError>;

    async fn update_memory_embedding(
        &self,
        id: &str,
        embedding: &[f32],
    ) -> Result<(), MemoraError>;

    /// Chunks of a memory in insertion order.
    async fn get_chunks_for_memory(&self, memory_id: &str)
    -> Result<Vec<MemoryChunk>, MemoraError>;

    async fn update_chunk_embedding(&self, id: &str, embedding: &[f32])
    -> Result<(), MemoraError>;

    // --- Similarity ---

    /// Ranks embedded chunks by cosine similarity within the search scope.
    async fn search_chunks(&self, search: &ChunkSearch) -> Result<Vec<ChunkMatch>, MemoraError>;
}
