// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory ingestion and similarity retrieval for the Memora RAG backend.
//!
//! - [`MemoryStore`] chunks, embeds and persists memories and resolves sessions.
//! - [`Retriever`] ranks stored chunks against a query within a session scope.

pub mod chunker;
pub mod retriever;
pub mod store;

pub use chunker::chunk_text;
pub use retriever::{RetrieveOptions, Retriever};
pub use store::{MemoryStore, NewMemory, StoreOptions, StoredMemory};
