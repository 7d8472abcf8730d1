// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixture: temp storage, hashing embedder, coordinator and services.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use memora_config::model::{EmbeddingConfig, MemoryConfig, RetrievalConfig};
use memora_embeddings::{BatchCoordinator, CoordinatorSettings, Embeddings};
use memora_memory::{MemoryStore, Retriever};
use memora_test_utils::{HashingEmbedder, TempStorage};

pub const DIM: usize = 64;

pub struct Fixture {
    pub temp: TempStorage,
    pub embedder: Arc<HashingEmbedder>,
    pub embeddings: Embeddings,
    pub store: MemoryStore,
    pub retriever: Retriever,
}

pub async fn fixture() -> Fixture {
    fixture_with(HashingEmbedder::new(DIM)).await
}

pub async fn fixture_with(embedder: HashingEmbedder) -> Fixture {
    fixture_with_config(embedder, test_embedding_config()).await
}

pub fn test_embedding_config() -> EmbeddingConfig {
    EmbeddingConfig {
        dimensions: Some(DIM),
        batch_timeout_ms: 5,
        ..EmbeddingConfig::default()
    }
}

pub async fn fixture_with_config(embedder: HashingEmbedder, config: EmbeddingConfig) -> Fixture {
    let temp = TempStorage::new().await.unwrap();
    let embedder = Arc::new(embedder);
    let coordinator = BatchCoordinator::start(
        embedder.clone(),
        CoordinatorSettings::from_config(&config),
        Some(temp.adapter()),
    );
    let embeddings = Embeddings::new(embedder.clone(), coordinator);
    let store = MemoryStore::new(temp.adapter(), embeddings.clone(), MemoryConfig::default());
    let retriever = Retriever::new(temp.adapter(), embeddings.clone(), RetrievalConfig::default());
    Fixture {
        temp,
        embedder,
        embeddings,
        store,
        retriever,
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
