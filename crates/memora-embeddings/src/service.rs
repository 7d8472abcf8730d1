// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding facade used by the memory and retrieval services.

use std::sync::Arc;
use std::time::Duration;

use memora_core::{EmbeddingProvider, MemoraError};
use tracing::debug;

use crate::coordinator::{BatchCoordinator, EmbeddingToken, failure_reason};

/// Synchronous and batched access to one embedding provider.
#[derive(Clone)]
pub struct Embeddings {
    provider: Arc<dyn EmbeddingProvider>,
    coordinator: BatchCoordinator,
}

impl Embeddings {
    /// Wraps a provider and a coordinator that was started over the same provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, coordinator: BatchCoordinator) -> Self {
        Self {
            provider,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &BatchCoordinator {
        &self.coordinator
    }

    pub fn dimension(&self) -> usize {
        self.coordinator.dimension()
    }

    /// Embeds `text` with a direct provider call, bypassing the batch queue.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, MemoraError> {
        if text.is_empty() {
            return Err(MemoraError::validation("text", "must not be empty"));
        }
        let settings = self.coordinator.settings();
        let vector = self
            .provider
            .embed(text, &settings.model)
            .await
            .map_err(|e| MemoraError::EmbeddingFailed {
                reason: failure_reason(e),
            })?;
        if vector.len() != settings.dimension {
            return Err(MemoraError::DimensionMismatch {
                expected: settings.dimension,
                actual: vector.len(),
            });
        }
        debug!(chars = text.chars().count(), "embedded text directly");
        Ok(vector)
    }

    /// Embeds `text` through the coordinator and waits with the default timeout.
    pub async fn embed_text_async(&self, text: &str) -> Result<Vec<f32>, MemoraError> {
        self.coordinator.embed(text).await
    }

    /// Enqueues `text` and returns its token without waiting.
    pub fn embed_text_async_no_wait(&self, text: &str) -> Result<EmbeddingToken, MemoraError> {
        self.coordinator.enqueue(text)
    }

    /// Claims a token, waiting up to `timeout` or the configured default.
    pub async fn await_embedding(
        &self,
        token: EmbeddingToken,
        timeout: Option<Duration>,
    ) -> Result<Vec<f32>, MemoraError> {
        let timeout = timeout.unwrap_or(self.coordinator.settings().await_timeout);
        self.coordinator.await_embedding(token, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorSettings;
    use memora_config::model::EmbeddingConfig;
    use memora_test_utils::HashingEmbedder;
    use tracing_test::traced_test;

    fn embeddings(embedder: Arc<HashingEmbedder>, dimension: usize) -> Embeddings {
        let config = EmbeddingConfig {
            dimensions: Some(dimension),
            batch_timeout_ms: 10,
            ..EmbeddingConfig::default()
        };
        let settings = CoordinatorSettings::from_config(&config);
        let coordinator = BatchCoordinator::start(embedder.clone(), settings, None);
        Embeddings::new(embedder, coordinator)
    }

    #[tokio::test]
    #[traced_test]
    async fn direct_and_batched_paths_agree() {
        let embedder = Arc::new(HashingEmbedder::new(32));
        let service = embeddings(embedder.clone(), 32);

        let direct = service.embed_text("elixir is functional").await.unwrap();
        let batched = service
            .embed_text_async("elixir is functional")
            .await
            .unwrap();
        assert_eq!(direct, batched);
        assert_eq!(direct.len(), 32);
        assert_eq!(embedder.calls_for("elixir is functional"), 2);
        assert!(logs_contain("embedded text directly"));
    }

    #[tokio::test]
    async fn no_wait_then_await() {
        let service = embeddings(Arc::new(HashingEmbedder::new(8)), 8);
        let token = service.embed_text_async_no_wait("later").unwrap();
        let vector = service.await_embedding(token, None).await.unwrap();
        assert_eq!(vector.len(), 8);
    }

    #[tokio::test]
    async fn direct_path_checks_dimension() {
        let embedder = Arc::new(HashingEmbedder::new(8).with_output_dimension(4));
        let service = embeddings(embedder, 8);
        let err = service.embed_text("short").await.unwrap_err();
        assert!(matches!(
            err,
            MemoraError::DimensionMismatch {
                expected: 8,
                actual: 4
            }
        ));
    }

    #[tokio::test]
    async fn direct_path_reports_provider_failure() {
        let embedder = Arc::new(HashingEmbedder::new(8).failing_on("boom"));
        let service = embeddings(embedder, 8);
        let err = service.embed_text("boom").await.unwrap_err();
        assert!(matches!(err, MemoraError::EmbeddingFailed { .. }));
    }
}
