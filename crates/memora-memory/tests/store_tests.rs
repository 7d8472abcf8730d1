// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory ingestion, session management and deletion.

mod common;

use common::{DIM, eventually, fixture, fixture_with, fixture_with_config, test_embedding_config};
use memora_config::model::EmbeddingConfig;
use memora_core::{MemoraError, MemoryKind, Metadata, StorageAdapter};
use memora_memory::{NewMemory, StoreOptions};
use memora_test_utils::HashingEmbedder;

fn options(chunk_size: usize, chunk_overlap: usize) -> StoreOptions {
    StoreOptions {
        chunk_size,
        chunk_overlap,
        defer_embeddings: false,
    }
}

#[tokio::test]
async fn short_text_becomes_one_embedded_chunk() {
    let fx = fixture().await;
    let stored = fx
        .store
        .store_memory(
            NewMemory::new("Rust has no garbage collector", MemoryKind::Fact),
            StoreOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(stored.chunks.len(), 1);
    assert_eq!(stored.chunks[0].text, "Rust has no garbage collector");
    assert_eq!(stored.memory.embedding.as_ref().map(Vec::len), Some(DIM));
    assert_eq!(stored.chunks[0].embedding, stored.memory.embedding);
    // Whole text and its only chunk are the same string: one provider call.
    assert_eq!(fx.embedder.calls_for("Rust has no garbage collector"), 1);

    let loaded = fx.store.get_memory(&stored.memory.id).await.unwrap();
    assert_eq!(loaded, stored);
}

#[tokio::test]
async fn long_text_is_chunked_with_overlap() {
    let fx = fixture().await;
    let text = "the quick brown fox jumps over the lazy dog";
    let stored = fx
        .store
        .store_memory(NewMemory::new(text, MemoryKind::Doc), options(10, 3))
        .await
        .unwrap();

    assert!(stored.chunks.len() > 1);
    let mut rebuilt = stored.chunks[0].text.clone();
    for chunk in &stored.chunks[1..] {
        rebuilt.extend(chunk.text.chars().skip(3));
    }
    assert_eq!(rebuilt, text);
    assert!(stored.chunks.iter().all(|c| c.embedding.is_some()));

    let chunks = fx
        .retriever
        .get_memory_chunks(&stored.memory.id)
        .await
        .unwrap();
    let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
    let expected: Vec<_> = stored.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, expected);
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let fx = fixture().await;
    let err = fx
        .store
        .store_memory(NewMemory::new("  ", MemoryKind::Note), StoreOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoraError::Validation { ref field, .. } if field == "text"));

    let err = fx
        .store
        .store_memory(
            NewMemory::new("orphan", MemoryKind::Note).in_session("no-such-session"),
            StoreOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MemoraError::NotFound { entity: "session", .. }));

    let err = fx
        .store
        .store_memory(NewMemory::new("text", MemoryKind::Note), options(4, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoraError::Validation { .. }));
    assert_eq!(fx.embedder.total_calls(), 0);
}

#[tokio::test]
async fn failed_chunk_embedding_persists_nothing() {
    let fx = fixture_with(HashingEmbedder::new(DIM).failing_on("bbbbb")).await;
    let err = fx
        .store
        .store_memory(NewMemory::new("aaaaabbbbb", MemoryKind::Note), options(5, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoraError::EmbeddingFailed { .. }));
    assert!(fx.store.list_memories(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn simple_store_uses_one_chunk_regardless_of_length() {
    let fx = fixture().await;
    let text = "x".repeat(2500);
    let stored = fx
        .store
        .store_memory_simple(NewMemory::new(text.clone(), MemoryKind::Code))
        .await
        .unwrap();
    assert_eq!(stored.chunks.len(), 1);
    assert_eq!(stored.chunks[0].text, text);
    assert_eq!(stored.chunks[0].embedding, stored.memory.embedding);
}

#[tokio::test]
async fn deferred_store_fills_embeddings_later() {
    let fx = fixture().await;
    let stored = fx
        .store
        .store_memory(
            NewMemory::new("eventually embedded", MemoryKind::Event),
            StoreOptions {
                defer_embeddings: true,
                ..StoreOptions::default()
            },
        )
        .await
        .unwrap();
    assert!(stored.memory.embedding.is_none());
    assert!(stored.chunks.iter().all(|c| c.embedding.is_none()));

    let id = stored.memory.id.clone();
    let filled = eventually(|| {
        let id = id.clone();
        let store = &fx.store;
        async move {
            let loaded = store.get_memory(&id).await.unwrap();
            loaded.memory.embedding.is_some() && loaded.chunks.iter().all(|c| c.embedding.is_some())
        }
    })
    .await;
    assert!(filled, "deferred embeddings never arrived");
}

#[tokio::test]
async fn whitespace_only_chunks_are_embedded() {
    let fx = fixture().await;
    let text = format!("alpha{}omega", " ".repeat(30));
    let stored = fx
        .store
        .store_memory(NewMemory::new(text.as_str(), MemoryKind::Doc), options(10, 0))
        .await
        .unwrap();

    let texts: Vec<_> = stored.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, ["alpha     ", "          ", "          ", "     omega"]);
    assert!(stored.chunks.iter().all(|c| c.embedding.is_some()));
    // The two blank chunks share one provider call.
    assert_eq!(fx.embedder.calls_for("          "), 1);
}

#[tokio::test]
async fn deferred_whitespace_chunks_are_filled_too() {
    let fx = fixture().await;
    let text = format!("start{}end", "\n".repeat(12));
    let stored = fx
        .store
        .store_memory(
            NewMemory::new(text.as_str(), MemoryKind::Doc),
            StoreOptions {
                chunk_size: 5,
                chunk_overlap: 0,
                defer_embeddings: true,
            },
        )
        .await
        .unwrap();
    assert!(stored.chunks.iter().any(|c| c.text.trim().is_empty()));

    let id = stored.memory.id.clone();
    let filled = eventually(|| {
        let id = id.clone();
        let store = &fx.store;
        async move {
            let loaded = store.get_memory(&id).await.unwrap();
            loaded.memory.embedding.is_some() && loaded.chunks.iter().all(|c| c.embedding.is_some())
        }
    })
    .await;
    assert!(filled, "blank chunks never received embeddings");
}

#[tokio::test]
async fn documents_larger_than_the_queue_are_stored() {
    let config = EmbeddingConfig {
        batch_size: 4,
        queue_capacity: 8,
        ..test_embedding_config()
    };
    let fx = fixture_with_config(HashingEmbedder::new(DIM), config).await;
    let text: String = (0..60).map(|i| format!("word{i:02} ")).collect();
    let stored = fx
        .store
        .store_memory(NewMemory::new(text.as_str(), MemoryKind::Doc), options(7, 0))
        .await
        .unwrap();

    assert!(stored.chunks.len() > 8 * 4);
    assert!(stored.chunks.iter().all(|c| c.embedding.is_some()));
    let rebuilt: String = stored.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, text);
}

#[tokio::test]
async fn sessions_are_created_once() {
    let fx = fixture().await;
    let mut first_meta = Metadata::new();
    first_meta.insert("topic".into(), "rust".into());
    let first = fx
        .store
        .get_or_create_session("research", &first_meta)
        .await
        .unwrap();

    let mut other_meta = Metadata::new();
    other_meta.insert("topic".into(), "go".into());
    let second = fx
        .store
        .get_or_create_session("research", &other_meta)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.metadata, first_meta);
    assert!(matches!(
        fx.store.get_or_create_session("", &Metadata::new()).await,
        Err(MemoraError::Validation { .. })
    ));
}

#[tokio::test]
async fn listing_is_scoped_and_newest_first() {
    let fx = fixture().await;
    let session = fx
        .store
        .get_or_create_session("lister", &Metadata::new())
        .await
        .unwrap();
    for text in ["first global", "second global"] {
        fx.store
            .store_memory_simple(NewMemory::new(text, MemoryKind::Note))
            .await
            .unwrap();
    }
    fx.store
        .store_memory_simple(NewMemory::new("private", MemoryKind::Note).in_session(&session.id))
        .await
        .unwrap();

    let global = fx.store.list_memories(None).await.unwrap();
    let texts: Vec<_> = global.iter().map(|m| m.memory.text.as_str()).collect();
    assert_eq!(texts, vec!["second global", "first global"]);
    assert!(global.iter().all(|m| m.chunks.len() == 1));

    let scoped = fx.store.list_memories(Some(&session.id)).await.unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].memory.text, "private");
}

#[tokio::test]
async fn delete_memory_cascades_and_reports_missing() {
    let fx = fixture().await;
    let stored = fx
        .store
        .store_memory(NewMemory::new("short lived", MemoryKind::Note), StoreOptions::default())
        .await
        .unwrap();

    fx.store.delete_memory(&stored.memory.id).await.unwrap();
    assert!(matches!(
        fx.store.delete_memory(&stored.memory.id).await,
        Err(MemoraError::NotFound { entity: "memory", .. })
    ));
    assert!(matches!(
        fx.store.get_memory(&stored.memory.id).await,
        Err(MemoraError::NotFound { .. })
    ));
    assert!(
        fx.temp
            .adapter()
            .get_chunks_for_memory(&stored.memory.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn deleting_a_session_makes_its_memories_global() {
    let fx = fixture().await;
    let session = fx
        .store
        .get_or_create_session("ephemeral", &Metadata::new())
        .await
        .unwrap();
    let stored = fx
        .store
        .store_memory_simple(NewMemory::new("survives", MemoryKind::Fact).in_session(&session.id))
        .await
        .unwrap();

    let deleted = fx.store.delete_session("ephemeral").await.unwrap();
    assert_eq!(deleted.id, session.id);

    let memory = fx.store.get_memory(&stored.memory.id).await.unwrap();
    assert_eq!(memory.memory.session_id, None);
    assert!(matches!(
        fx.store.delete_session("ephemeral").await,
        Err(MemoraError::SessionNotFound { .. })
    ));
}
