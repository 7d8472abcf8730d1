// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-stack fixture: temp storage, coordinator, memory services, router
//! and chat service wired the way the binary wires them.

#![allow(dead_code)]

use std::sync::Arc;

use memora_chat::ChatService;
use memora_config::model::{ChatConfig, EmbeddingConfig, LlmConfig, MemoryConfig, RetrievalConfig};
use memora_embeddings::{BatchCoordinator, CoordinatorSettings, Embeddings};
use memora_memory::{MemoryStore, Retriever};
use memora_router::LlmRouter;
use memora_test_utils::{HashingEmbedder, MockChatProvider, TempStorage};

pub const DIM: usize = 64;
pub const PREAMBLE: &str = "You answer from the notes.";

pub struct Stack {
    pub temp: TempStorage,
    pub embedder: Arc<HashingEmbedder>,
    pub provider: Arc<MockChatProvider>,
    pub memory: Arc<MemoryStore>,
    pub chat: ChatService,
}

pub async fn stack() -> Stack {
    stack_with(HashingEmbedder::new(DIM), MockChatProvider::new("openai")).await
}

pub async fn stack_with(embedder: HashingEmbedder, provider: MockChatProvider) -> Stack {
    let temp = TempStorage::new().await.unwrap();
    let embedder = Arc::new(embedder);
    let provider = Arc::new(provider);

    let embedding_config = EmbeddingConfig {
        dimensions: Some(DIM),
        batch_timeout_ms: 5,
        ..EmbeddingConfig::default()
    };
    let coordinator = BatchCoordinator::start(
        embedder.clone(),
        CoordinatorSettings::from_config(&embedding_config),
        Some(temp.adapter()),
    );
    let embeddings = Embeddings::new(embedder.clone(), coordinator);

    let memory = Arc::new(MemoryStore::new(
        temp.adapter(),
        embeddings.clone(),
        MemoryConfig::default(),
    ));
    let retriever = Arc::new(Retriever::new(
        temp.adapter(),
        embeddings,
        RetrievalConfig::default(),
    ));
    let router = Arc::new(LlmRouter::new(LlmConfig::default()).with_provider(provider.clone()));
    let chat = ChatService::new(
        temp.adapter(),
        memory.clone(),
        retriever,
        router,
        ChatConfig {
            system_prompt: PREAMBLE.to_string(),
            ..ChatConfig::default()
        },
    );

    Stack {
        temp,
        embedder,
        provider,
        memory,
        chat,
    }
}
