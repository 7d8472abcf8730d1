// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory ingestion and session management.
//!
//! A memory is chunked, every piece is embedded, and the memory plus all of
//! its chunks are written in one transaction. Nothing is persisted if any
//! embedding fails.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use memora_config::model::MemoryConfig;
use memora_core::{
    Memory, MemoryChunk, MemoryKind, MemoraError, Metadata, Session, StorageAdapter, new_id,
    timestamp_now,
};
use memora_embeddings::Embeddings;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunker::chunk_text;

/// Input for [`MemoryStore::store_memory`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub text: String,
    pub kind: MemoryKind,
    /// Owning session; `None` stores a global memory.
    pub session_id: Option<String>,
    pub metadata: Metadata,
}

impl NewMemory {
    pub fn new(text: impl Into<String>, kind: MemoryKind) -> Self {
        Self {
            text: text.into(),
            kind,
            session_id: None,
            metadata: Metadata::new(),
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Chunking and embedding options for one ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Persist with null embeddings and let the coordinator fill them in.
    pub defer_embeddings: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

impl StoreOptions {
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            defer_embeddings: config.defer_embeddings,
        }
    }
}

/// A memory together with its chunks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub chunks: Vec<MemoryChunk>,
}

/// Persists memories and sessions on top of a [`StorageAdapter`].
pub struct MemoryStore {
    storage: Arc<dyn StorageAdapter>,
    embeddings: Embeddings,
    config: MemoryConfig,
}

impl MemoryStore {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embeddings: Embeddings,
        config: MemoryConfig,
    ) -> Self {
        Self {
            storage,
            embeddings,
            config,
        }
    }

    /// Options derived from this store's configuration.
    pub fn default_options(&self) -> StoreOptions {
        StoreOptions::from_config(&self.config)
    }

    /// Chunks, embeds and stores `new` as one atomic unit.
    ///
    /// 1. Validates the text and the owning session
    /// 2. Splits the text into overlapping chunks
    /// 3. Embeds the whole text and every chunk through the batch coordinator
    ///    (identical pieces cost one provider call). Chunks are submitted a
    ///    batch at a time, so a long document waits on the queue instead of
    ///    overflowing it.
    /// 4. Inserts the memory and all chunks in a single transaction
    ///
    /// With `defer_embeddings` set, step 3 is skipped: rows are written with
    /// null embeddings and write-back jobs are scheduled afterwards.
    pub async fn store_memory(
        &self,
        new: NewMemory,
        options: StoreOptions,
    ) -> Result<StoredMemory, MemoraError> {
        self.validate(&new).await?;
        let pieces = chunk_text(&new.text, options.chunk_size, options.chunk_overlap)?;

        if options.defer_embeddings {
            return self.store_deferred(new, pieces).await;
        }

        let coordinator = self.embeddings.coordinator();
        let settings = coordinator.settings();
        // One slot stays free for the whole-text job.
        let window = settings
            .batch_size
            .min(settings.queue_capacity.saturating_sub(1))
            .max(1);
        let whole = coordinator.embed(&new.text);
        let parts = stream::iter(pieces.iter())
            .map(|piece| coordinator.embed(piece))
            .buffered(window)
            .try_collect::<Vec<_>>();
        let (embedding, chunk_embeddings) = futures::try_join!(whole, parts)?;

        let memory = build_memory(new, Some(embedding));
        let chunks: Vec<MemoryChunk> = pieces
            .into_iter()
            .zip(chunk_embeddings)
            .map(|(text, embedding)| build_chunk(&memory.id, text, Some(embedding)))
            .collect();

        self.storage
            .insert_memory_with_chunks(&memory, &chunks)
            .await?;
        info!(
            memory_id = %memory.id,
            kind = %memory.kind,
            chunks = chunks.len(),
            global = memory.session_id.is_none(),
            "memory stored"
        );
        Ok(StoredMemory { memory, chunks })
    }

    /// Stores `new` as exactly one chunk equal to the full text.
    ///
    /// One embedding serves both the memory and its chunk.
    pub async fn store_memory_simple(&self, new: NewMemory) -> Result<StoredMemory, MemoraError> {
        self.validate(&new).await?;
        let embedding = self.embeddings.embed_text_async(&new.text).await?;

        let text = new.text.clone();
        let memory = build_memory(new, Some(embedding.clone()));
        let chunks = vec![build_chunk(&memory.id, text, Some(embedding))];

        self.storage
            .insert_memory_with_chunks(&memory, &chunks)
            .await?;
        info!(memory_id = %memory.id, kind = %memory.kind, "memory stored without chunking");
        Ok(StoredMemory { memory, chunks })
    }

    async fn store_deferred(
        &self,
        new: NewMemory,
        pieces: Vec<String>,
    ) -> Result<StoredMemory, MemoraError> {
        let memory = build_memory(new, None);
        let chunks: Vec<MemoryChunk> = pieces
            .into_iter()
            .map(|text| build_chunk(&memory.id, text, None))
            .collect();
        self.storage
            .insert_memory_with_chunks(&memory, &chunks)
            .await?;

        // The rows are committed; a refused job leaves that embedding null.
        let coordinator = self.embeddings.coordinator();
        if let Err(e) = coordinator.embed_memory(&memory.id, &memory.text) {
            warn!(memory_id = %memory.id, error = %e, "could not schedule memory embedding");
        }
        for chunk in &chunks {
            if let Err(e) = coordinator.embed_chunk(&chunk.id, &chunk.text) {
                warn!(chunk_id = %chunk.id, error = %e, "could not schedule chunk embedding");
            }
        }
        info!(
            memory_id = %memory.id,
            kind = %memory.kind,
            chunks = chunks.len(),
            "memory stored; embeddings deferred"
        );
        Ok(StoredMemory { memory, chunks })
    }

    async fn validate(&self, new: &NewMemory) -> Result<(), MemoraError> {
        if new.text.trim().is_empty() {
            return Err(MemoraError::validation("text", "must not be empty"));
        }
        if let Some(session_id) = &new.session_id {
            if self.storage.get_session(session_id).await?.is_none() {
                return Err(MemoraError::not_found("session", session_id.as_str()));
            }
        }
        Ok(())
    }

    /// Returns the session named `name`, creating it with `metadata` first if
    /// needed. An existing session is returned unchanged.
    pub async fn get_or_create_session(
        &self,
        name: &str,
        metadata: &Metadata,
    ) -> Result<Session, MemoraError> {
        if name.trim().is_empty() {
            return Err(MemoraError::validation("name", "must not be empty"));
        }
        let session = self.storage.get_or_create_session(name, metadata).await?;
        debug!(session_id = %session.id, name, "session resolved");
        Ok(session)
    }

    /// Resolves a session by name.
    pub async fn find_session(&self, name: &str) -> Result<Session, MemoraError> {
        self.storage
            .get_session_by_name(name)
            .await?
            .ok_or_else(|| MemoraError::SessionNotFound {
                name: name.to_string(),
            })
    }

    /// Deletes the session named `name` and its messages. Memories it owned
    /// become global.
    pub async fn delete_session(&self, name: &str) -> Result<Session, MemoraError> {
        let session = self.find_session(name).await?;
        if !self.storage.delete_session(&session.id).await? {
            return Err(MemoraError::SessionNotFound {
                name: name.to_string(),
            });
        }
        info!(session_id = %session.id, name, "session deleted");
        Ok(session)
    }

    /// Memories with their chunks, newest first. `None` lists global memories.
    pub async fn list_memories(
        &self,
        session_id: Option<&str>,
    ) -> Result<Vec<StoredMemory>, MemoraError> {
        let memories = self.storage.list_memories(session_id).await?;
        let mut stored = Vec::with_capacity(memories.len());
        for memory in memories {
            let chunks = self.storage.get_chunks_for_memory(&memory.id).await?;
            stored.push(StoredMemory { memory, chunks });
        }
        Ok(stored)
    }

    pub async fn get_memory(&self, id: &str) -> Result<StoredMemory, MemoraError> {
        let memory = self
            .storage
            .get_memory(id)
            .await?
            .ok_or_else(|| MemoraError::not_found("memory", id))?;
        let chunks = self.storage.get_chunks_for_memory(id).await?;
        Ok(StoredMemory { memory, chunks })
    }

    /// Deletes a memory and, by cascade, its chunks.
    pub async fn delete_memory(&self, id: &str) -> Result<(), MemoraError> {
        if !self.storage.delete_memory(id).await? {
            return Err(MemoraError::not_found("memory", id));
        }
        info!(memory_id = id, "memory deleted");
        Ok(())
    }
}

fn build_memory(new: NewMemory, embedding: Option<Vec<f32>>) -> Memory {
    Memory {
        id: new_id(),
        kind: new.kind,
        text: new.text,
        metadata: new.metadata,
        embedding,
        session_id: new.session_id,
        created_at: timestamp_now(),
    }
}

fn build_chunk(memory_id: &str, text: String, embedding: Option<Vec<f32>>) -> MemoryChunk {
    MemoryChunk {
        id: new_id(),
        memory_id: memory_id.to_string(),
        text,
        embedding,
        created_at: timestamp_now(),
    }
}
