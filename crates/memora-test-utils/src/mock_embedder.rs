// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding provider based on feature hashing.
//!
//! Each lowercase alphanumeric token is hashed into one of `dimension`
//! buckets and the resulting count vector is L2-normalized. Texts sharing
//! words therefore have positive cosine similarity, which is enough to
//! exercise retrieval end to end without a model.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use memora_core::{AdapterType, EmbeddingProvider, HealthStatus, MemoraError, PluginAdapter};

use crate::lock;

/// A deterministic [`EmbeddingProvider`] with call counting and fault injection.
pub struct HashingEmbedder {
    dimension: usize,
    /// Length of vectors actually returned; differs from `dimension` only
    /// when simulating a misbehaving provider.
    output_dimension: usize,
    delay: Option<Duration>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            output_dimension: dimension,
            delay: None,
            failing: HashSet::new(),
            panicking: HashSet::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail with `EmbeddingFailed` whenever `text` is embedded.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.failing.insert(text.into());
        self
    }

    /// Panic whenever `text` is embedded.
    pub fn panicking_on(mut self, text: impl Into<String>) -> Self {
        self.panicking.insert(text.into());
        self
    }

    /// Return vectors of the wrong length.
    pub fn with_output_dimension(mut self, dimension: usize) -> Self {
        self.output_dimension = dimension;
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of provider calls made for exactly `text`.
    pub fn calls_for(&self, text: &str) -> usize {
        lock(&self.calls).get(text).copied().unwrap_or(0)
    }

    /// Total number of provider calls.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// The vector this embedder produces for `text`, without counting a call.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        hash_embed(text, self.output_dimension)
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension.max(1)];
    let lowered = text.to_lowercase();
    let mut any = false;
    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let bucket = (hasher.finish() % vector.len() as u64) as usize;
        vector[bucket] += 1.0;
        any = true;
    }
    if !any {
        // Blank or punctuation-only text still needs a non-zero vector.
        vector[0] = 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    vector.iter_mut().for_each(|x| *x /= norm);
    vector
}

#[async_trait]
impl PluginAdapter for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MemoraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MemoraError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>, MemoraError> {
        *lock(&self.calls).entry(text.to_string()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking.contains(text) {
            panic!("injected embedding panic for {text:?}");
        }
        if self.failing.contains(text) {
            return Err(MemoraError::EmbeddingFailed {
                reason: format!("injected failure for {text:?}"),
            });
        }
        Ok(hash_embed(text, self.output_dimension))
    }
}
