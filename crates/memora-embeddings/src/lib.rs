// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding pipeline for the Memora RAG backend.
//!
//! [`BatchCoordinator`] coalesces concurrent embedding requests into
//! deduplicated provider calls. [`Embeddings`] is the facade the memory and
//! retrieval services use.

pub mod coordinator;
pub mod model;
pub mod service;

pub use coordinator::{BatchCoordinator, CoordinatorSettings, EmbeddingToken};
pub use model::{DEFAULT_DIMENSION, dimension_for_model, is_known_model, resolve_dimension};
pub use service::Embeddings;
