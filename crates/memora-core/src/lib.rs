// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Memora retrieval-augmented backend.
//!
//! This crate provides the foundational trait definitions, error types, and
//! entity types used throughout the Memora workspace. Embedding, chat, and
//! storage backends all implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorReason, MemoraError};
pub use types::{
    AdapterType, ChatEnvelope, ChatMessage, ChatOptions, Choice, ChunkMatch, ChunkScope,
    ChunkSearch, HealthStatus, Memory, MemoryChunk, MemoryKind, Message, Metadata, Role, Session,
    Usage, new_id, timestamp_now,
};

pub use traits::{ChatProvider, ChatStream, EmbeddingProvider, PluginAdapter, StorageAdapter};
