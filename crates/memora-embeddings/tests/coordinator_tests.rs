// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behavioral tests for the embedding batch coordinator.

use std::sync::Arc;
use std::time::Duration;

use memora_core::{Memory, MemoryChunk, MemoryKind, MemoraError, Metadata, new_id, timestamp_now};
use memora_embeddings::{BatchCoordinator, CoordinatorSettings};
use memora_test_utils::{HashingEmbedder, TempStorage};

const DIM: usize = 16;
const WAIT: Duration = Duration::from_secs(5);

fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        model: "test-model".into(),
        dimension: DIM,
        batch_size: 32,
        batch_timeout: Duration::from_millis(50),
        max_concurrent_batches: 2,
        queue_capacity: 128,
        await_timeout: WAIT,
        pending_ttl: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn one_window_one_call_per_unique_text() {
    let embedder = Arc::new(HashingEmbedder::new(DIM));
    let coordinator = BatchCoordinator::start(embedder.clone(), settings(), None);

    let texts = ["alpha", "beta", "alpha", "alpha", "beta", "gamma"];
    let tokens: Vec<_> = texts
        .iter()
        .map(|t| coordinator.enqueue(t).unwrap())
        .collect();

    let mut results = Vec::new();
    for token in tokens {
        results.push(coordinator.await_embedding(token, WAIT).await.unwrap());
    }

    assert_eq!(embedder.calls_for("alpha"), 1);
    assert_eq!(embedder.calls_for("beta"), 1);
    assert_eq!(embedder.calls_for("gamma"), 1);
    assert_eq!(embedder.total_calls(), 3);
    assert_eq!(results[0], results[2]);
    assert_eq!(results[0], results[3]);
    assert_eq!(results[1], results[4]);
    assert_eq!(results[0], embedder.vector_for("alpha"));
}

#[tokio::test]
async fn concurrent_callers_share_the_vector() {
    let embedder = Arc::new(HashingEmbedder::new(DIM).with_delay(Duration::from_millis(20)));
    let coordinator = BatchCoordinator::start(embedder.clone(), settings(), None);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.embed("shared question").await })
        })
        .collect();
    let mut vectors = Vec::new();
    for handle in handles {
        vectors.push(handle.await.unwrap().unwrap());
    }

    assert!(vectors.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(embedder.calls_for("shared question"), 1);
}

#[tokio::test]
async fn failures_are_isolated_per_text() {
    let embedder = Arc::new(
        HashingEmbedder::new(DIM)
            .failing_on("bad")
            .panicking_on("explode"),
    );
    let coordinator = BatchCoordinator::start(embedder.clone(), settings(), None);

    let good = coordinator.enqueue("good").unwrap();
    let bad = coordinator.enqueue("bad").unwrap();
    let bad_again = coordinator.enqueue("bad").unwrap();
    let explode = coordinator.enqueue("explode").unwrap();

    assert_eq!(coordinator.await_embedding(good, WAIT).await.unwrap().len(), DIM);
    for token in [bad, bad_again, explode] {
        let err = coordinator.await_embedding(token, WAIT).await.unwrap_err();
        assert!(matches!(err, MemoraError::EmbeddingFailed { .. }), "{err}");
    }
    assert_eq!(embedder.calls_for("bad"), 1);

    // The coordinator keeps working after a provider panic.
    assert!(coordinator.embed("still alive").await.is_ok());
}

#[tokio::test]
async fn wrong_dimension_fails_the_job() {
    let embedder = Arc::new(HashingEmbedder::new(DIM).with_output_dimension(DIM / 2));
    let coordinator = BatchCoordinator::start(embedder, settings(), None);
    let err = coordinator.embed("anything").await.unwrap_err();
    match err {
        MemoraError::EmbeddingFailed { reason } => assert!(reason.contains("dimensions")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn timeout_consumes_the_token() {
    let embedder = Arc::new(HashingEmbedder::new(DIM).with_delay(Duration::from_millis(300)));
    let coordinator = BatchCoordinator::start(embedder.clone(), settings(), None);

    let token = coordinator.enqueue("slow").unwrap();
    let err = coordinator
        .await_embedding(token, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoraError::Timeout { .. }));

    let again = coordinator.await_embedding(token, WAIT).await.unwrap_err();
    assert!(matches!(again, MemoraError::NotFound { .. }));

    // The late result is discarded without disturbing later work.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(coordinator.pending_len(), 0);
    assert_eq!(embedder.calls_for("slow"), 1);
    assert!(coordinator.embed("fast enough").await.is_ok());
}

#[tokio::test]
async fn full_queue_is_overloaded() {
    let settings = CoordinatorSettings {
        queue_capacity: 1,
        ..settings()
    };
    let coordinator = BatchCoordinator::start(Arc::new(HashingEmbedder::new(DIM)), settings, None);

    // Nothing yields between the two calls, so the dispatcher cannot drain.
    let first = coordinator.enqueue("one").unwrap();
    let err = coordinator.enqueue("two").unwrap_err();
    assert!(matches!(err, MemoraError::Overloaded { capacity: 1 }));

    assert!(coordinator.await_embedding(first, WAIT).await.is_ok());
}

#[tokio::test]
async fn stale_tokens_are_purged() {
    let settings = CoordinatorSettings {
        batch_timeout: Duration::from_millis(5),
        pending_ttl: Duration::from_millis(50),
        ..settings()
    };
    let coordinator = BatchCoordinator::start(Arc::new(HashingEmbedder::new(DIM)), settings, None);

    let forgotten = coordinator.enqueue("never awaited").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The next job to reach the dispatcher triggers the purge.
    let fresh = coordinator.enqueue("awaited").unwrap();
    assert!(coordinator.await_embedding(fresh, WAIT).await.is_ok());

    let err = coordinator
        .await_embedding(forgotten, WAIT)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoraError::NotFound { .. }));
    assert_eq!(coordinator.pending_len(), 0);
}

#[tokio::test]
async fn shutdown_fails_queued_and_new_work() {
    let settings = CoordinatorSettings {
        batch_timeout: Duration::from_secs(10),
        ..settings()
    };
    let coordinator = BatchCoordinator::start(Arc::new(HashingEmbedder::new(DIM)), settings, None);

    let queued = coordinator.enqueue("queued").unwrap();
    coordinator.shutdown().await;

    let err = coordinator.await_embedding(queued, WAIT).await.unwrap_err();
    assert!(matches!(err, MemoraError::EmbeddingFailed { .. }));

    let err = coordinator.enqueue("after").unwrap_err();
    assert!(matches!(err, MemoraError::EmbeddingFailed { .. }));
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_batches() {
    let embedder = Arc::new(HashingEmbedder::new(DIM).with_delay(Duration::from_millis(100)));
    let settings = CoordinatorSettings {
        batch_timeout: Duration::from_millis(5),
        ..settings()
    };
    let coordinator = BatchCoordinator::start(embedder.clone(), settings, None);

    let token = coordinator.enqueue("in flight").unwrap();
    // Let the batch close and reach the provider.
    tokio::time::sleep(Duration::from_millis(30)).await;
    coordinator.shutdown().await;

    assert_eq!(coordinator.await_embedding(token, WAIT).await.unwrap().len(), DIM);
}

#[tokio::test]
async fn write_back_fills_stored_embeddings() {
    let temp = TempStorage::new().await.unwrap();
    let storage = temp.adapter();
    let embedder = Arc::new(HashingEmbedder::new(DIM));
    let coordinator =
        BatchCoordinator::start(embedder.clone(), settings(), Some(storage.clone()));

    let memory_id = new_id();
    let memory = Memory {
        id: memory_id.clone(),
        kind: MemoryKind::Doc,
        text: "deferred document".into(),
        metadata: Metadata::new(),
        embedding: None,
        session_id: None,
        created_at: timestamp_now(),
    };
    let chunk = MemoryChunk {
        id: new_id(),
        memory_id: memory_id.clone(),
        text: "deferred document".into(),
        embedding: None,
        created_at: timestamp_now(),
    };
    storage
        .insert_memory_with_chunks(&memory, std::slice::from_ref(&chunk))
        .await
        .unwrap();

    coordinator.embed_memory(&memory_id, &memory.text).unwrap();
    coordinator.embed_chunk(&chunk.id, &chunk.text).unwrap();

    let expected = embedder.vector_for("deferred document");
    let mut filled = false;
    for _ in 0..100 {
        let stored = storage.get_memory(&memory_id).await.unwrap().unwrap();
        let chunks = storage.get_chunks_for_memory(&memory_id).await.unwrap();
        if stored.embedding.is_some() && chunks[0].embedding.is_some() {
            assert_eq!(stored.embedding.as_deref(), Some(expected.as_slice()));
            assert_eq!(chunks[0].embedding.as_deref(), Some(expected.as_slice()));
            filled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(filled, "embeddings were never written back");
    // Same text, same window: one provider call for both rows.
    assert_eq!(embedder.calls_for("deferred document"), 1);
}

#[tokio::test]
async fn write_back_targets_the_right_rows() {
    let temp = TempStorage::new().await.unwrap();
    let storage = temp.adapter();
    let embedder = Arc::new(HashingEmbedder::new(DIM));
    let coordinator =
        BatchCoordinator::start(embedder.clone(), settings(), Some(storage.clone()));

    let memory_id = new_id();
    let memory = Memory {
        id: memory_id.clone(),
        kind: MemoryKind::Doc,
        text: "whole document about tides".into(),
        metadata: Metadata::new(),
        embedding: None,
        session_id: None,
        created_at: timestamp_now(),
    };
    let chunk = MemoryChunk {
        id: new_id(),
        memory_id: memory_id.clone(),
        text: "only the part about the moon".into(),
        embedding: None,
        created_at: timestamp_now(),
    };
    storage
        .insert_memory_with_chunks(&memory, std::slice::from_ref(&chunk))
        .await
        .unwrap();

    coordinator.embed_chunk(&chunk.id, &chunk.text).unwrap();
    coordinator.embed_memory(&memory_id, &memory.text).unwrap();

    let memory_vector = embedder.vector_for(&memory.text);
    let chunk_vector = embedder.vector_for(&chunk.text);
    assert_ne!(memory_vector, chunk_vector);

    let mut filled = false;
    for _ in 0..100 {
        let stored = storage.get_memory(&memory_id).await.unwrap().unwrap();
        let chunks = storage.get_chunks_for_memory(&memory_id).await.unwrap();
        if stored.embedding.is_some() && chunks[0].embedding.is_some() {
            assert_eq!(stored.embedding.as_deref(), Some(memory_vector.as_slice()));
            assert_eq!(chunks[0].embedding.as_deref(), Some(chunk_vector.as_slice()));
            filled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(filled, "embeddings were never written back");
}

#[tokio::test]
async fn dropping_every_handle_stops_the_dispatcher() {
    let embedder = Arc::new(HashingEmbedder::new(DIM));
    let coordinator = BatchCoordinator::start(embedder.clone(), settings(), None);
    assert!(coordinator.embed("before drop").await.is_ok());
    drop(coordinator);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(Arc::strong_count(&embedder), 1);
}
