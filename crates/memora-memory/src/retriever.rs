// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity retrieval over stored chunks.
//!
//! Ranking happens in the store; this layer resolves the query vector,
//! chooses the partition a query may see and normalizes scores.

use std::sync::Arc;

use memora_config::model::RetrievalConfig;
use memora_core::{
    ChunkMatch, ChunkScope, ChunkSearch, MemoraError, MemoryChunk, StorageAdapter,
};
use memora_embeddings::Embeddings;
use tracing::debug;

/// Filtering options for one retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrieveOptions {
    /// Minimum score, inclusive. Values outside `[0, 1]` match nothing.
    pub threshold: f64,
    /// Whether a session-scoped query also sees global memories.
    pub include_global: bool,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl RetrieveOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            include_global: config.include_global,
        }
    }
}

/// Ranks stored chunks by cosine similarity to a query.
pub struct Retriever {
    storage: Arc<dyn StorageAdapter>,
    embeddings: Embeddings,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embeddings: Embeddings,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            storage,
            embeddings,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Embeds `query` and returns the `k` best chunks scoring at least
    /// `options.threshold`, best first.
    ///
    /// `session_id = None` searches global memories only. An empty result is
    /// not an error; an embedding failure or timeout is.
    pub async fn retrieve(
        &self,
        query: &str,
        session_id: Option<&str>,
        k: usize,
        options: RetrieveOptions,
    ) -> Result<Vec<ChunkMatch>, MemoraError> {
        if matches_nothing(k, options.threshold) {
            return Ok(Vec::new());
        }
        let embedding = self.embeddings.embed_text_async(query).await?;
        self.retrieve_by_embedding(&embedding, session_id, k, options)
            .await
    }

    /// Like [`retrieve`](Self::retrieve) with a precomputed query vector.
    ///
    /// The vector must have the configured model's dimension.
    pub async fn retrieve_by_embedding(
        &self,
        embedding: &[f32],
        session_id: Option<&str>,
        k: usize,
        options: RetrieveOptions,
    ) -> Result<Vec<ChunkMatch>, MemoraError> {
        let expected = self.embeddings.dimension();
        if embedding.len() != expected {
            return Err(MemoraError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        if matches_nothing(k, options.threshold) {
            return Ok(Vec::new());
        }

        let scope = ChunkScope::resolve(session_id, options.include_global);
        let search = ChunkSearch {
            embedding: embedding.to_vec(),
            scope,
            threshold: options.threshold,
            limit: k,
        };
        let mut matches = self.storage.search_chunks(&search).await?;
        for m in &mut matches {
            m.score = round_score(m.score, self.config.score_precision);
        }
        debug!(
            scope = ?search.scope,
            k,
            threshold = options.threshold,
            results = matches.len(),
            "chunks retrieved"
        );
        Ok(matches)
    }

    /// Chunks of one memory in insertion order.
    pub async fn get_memory_chunks(&self, memory_id: &str) -> Result<Vec<MemoryChunk>, MemoraError> {
        if self.storage.get_memory(memory_id).await?.is_none() {
            return Err(MemoraError::not_found("memory", memory_id));
        }
        self.storage.get_chunks_for_memory(memory_id).await
    }
}

/// `k = 0` or a threshold outside `[0, 1]` can never select anything.
fn matches_nothing(k: usize, threshold: f64) -> bool {
    k == 0 || !(0.0..=1.0).contains(&threshold)
}

fn round_score(score: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(15) as i32);
    (score * factor).round() / factor
}
