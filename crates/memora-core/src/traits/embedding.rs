// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider trait for vector generation.

use async_trait::async_trait;

use crate::error::MemoraError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for generating vector embeddings from text.
///
/// Implementations wrap a concrete vendor client. Failures should be
/// reported as [`MemoraError::EmbeddingFailed`].
#[async_trait]
pub trait EmbeddingProvider: PluginAdapter {
    /// Embeds a single text with the given model.
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>, MemoraError>;
}
