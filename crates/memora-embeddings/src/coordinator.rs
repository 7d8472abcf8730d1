// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding batch coordinator.
//!
//! Callers enqueue texts and receive a single-use [`EmbeddingToken`]. A
//! dispatcher task drains the queue into batches, closing a batch when
//! `batch_size` jobs have arrived or `batch_timeout` has elapsed since its
//! first job. Jobs in a batch are grouped by exact text; the provider is
//! called once per unique text and the vector (or failure) fans out to every
//! job in the group. Batches run concurrently on at most
//! `max_concurrent_batches` workers.
//!
//! Results for awaited tokens travel over oneshot channels whose receivers
//! sit in the pending table until claimed. Claiming removes the entry, so a
//! token can be awaited once; a timed-out await drops the receiver and any
//! late result is discarded.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use memora_config::model::{EmbeddingConfig, MAX_CONCURRENT_BATCHES};
use memora_core::{EmbeddingProvider, MemoraError, StorageAdapter};
use metrics::counter;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::resolve_dimension;

/// Correlates an enqueued text with its eventual vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmbeddingToken(Uuid);

impl EmbeddingToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EmbeddingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EmbeddingToken {
    type Err = MemoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| MemoraError::validation("token", format!("`{s}` is not an embedding token")))
    }
}

/// Runtime settings for a [`BatchCoordinator`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub max_concurrent_batches: usize,
    pub queue_capacity: usize,
    pub await_timeout: Duration,
    pub pending_ttl: Duration,
}

impl CoordinatorSettings {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            dimension: resolve_dimension(config),
            batch_size: config.batch_size.max(1),
            batch_timeout: Duration::from_millis(config.batch_timeout_ms),
            max_concurrent_batches: config.max_concurrent_batches.clamp(1, MAX_CONCURRENT_BATCHES),
            queue_capacity: config.queue_capacity.max(1),
            await_timeout: Duration::from_millis(config.await_timeout_ms),
            pending_ttl: Duration::from_secs(config.pending_ttl_secs),
        }
    }
}

/// Where a finished vector goes.
enum JobTarget {
    /// Back to a caller holding a token.
    Reply(oneshot::Sender<Result<Vec<f32>, MemoraError>>),
    /// Onto a stored row.
    Store(StoredRow),
}

/// A persisted entity whose embedding column is filled in later.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredRow {
    Memory(String),
    Chunk(String),
}

struct Job {
    text: String,
    target: JobTarget,
}

struct PendingReply {
    rx: oneshot::Receiver<Result<Vec<f32>, MemoraError>>,
    enqueued_at: Instant,
}

/// State shared between the handle, the dispatcher and batch workers.
struct Shared {
    provider: Arc<dyn EmbeddingProvider>,
    storage: Option<Arc<dyn StorageAdapter>>,
    settings: CoordinatorSettings,
    pending: DashMap<EmbeddingToken, PendingReply>,
    workers: Arc<Semaphore>,
    cancel: CancellationToken,
}

/// Handle to a running coordinator. Cheap to clone.
///
/// The dispatcher stops when [`BatchCoordinator::shutdown`] is called or
/// when every handle has been dropped.
#[derive(Clone)]
pub struct BatchCoordinator {
    jobs: mpsc::Sender<Job>,
    shared: Arc<Shared>,
    dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BatchCoordinator {
    /// Spawns the dispatcher. Must be called within a Tokio runtime.
    ///
    /// `storage` is required only for [`embed_memory`](Self::embed_memory)
    /// and [`embed_chunk`](Self::embed_chunk) write-back jobs. The worker
    /// count is clamped to `1..=MAX_CONCURRENT_BATCHES`.
    pub fn start(
        provider: Arc<dyn EmbeddingProvider>,
        mut settings: CoordinatorSettings,
        storage: Option<Arc<dyn StorageAdapter>>,
    ) -> Self {
        settings.max_concurrent_batches = settings
            .max_concurrent_batches
            .clamp(1, MAX_CONCURRENT_BATCHES);
        let (jobs, rx) = mpsc::channel(settings.queue_capacity.max(1));
        info!(
            model = %settings.model,
            dimension = settings.dimension,
            batch_size = settings.batch_size,
            batch_timeout_ms = settings.batch_timeout.as_millis() as u64,
            workers = settings.max_concurrent_batches,
            "embedding coordinator started"
        );
        let shared = Arc::new(Shared {
            provider,
            storage,
            workers: Arc::new(Semaphore::new(settings.max_concurrent_batches)),
            settings,
            pending: DashMap::new(),
            cancel: CancellationToken::new(),
        });
        let handle = tokio::spawn(dispatch_loop(Arc::clone(&shared), rx));
        Self {
            jobs,
            shared,
            dispatcher: Arc::new(Mutex::new(Some(handle))),
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.shared.settings
    }

    /// Length of the vectors this coordinator delivers.
    pub fn dimension(&self) -> usize {
        self.shared.settings.dimension
    }

    /// Tokens issued but not yet claimed.
    pub fn pending_len(&self) -> usize {
        self.shared.pending.len()
    }

    /// Queues `text` and returns the token to claim its vector with.
    ///
    /// Never blocks: a full queue fails immediately with `Overloaded`.
    pub fn enqueue(&self, text: &str) -> Result<EmbeddingToken, MemoraError> {
        validate_text(text)?;
        let (tx, rx) = oneshot::channel();
        self.submit(Job {
            text: text.to_string(),
            target: JobTarget::Reply(tx),
        })?;
        let token = EmbeddingToken::generate();
        self.shared.pending.insert(
            token,
            PendingReply {
                rx,
                enqueued_at: Instant::now(),
            },
        );
        Ok(token)
    }

    /// Waits up to `timeout` for the vector behind `token`.
    ///
    /// The token is consumed whatever the outcome. Awaiting it again, or
    /// awaiting a token that was purged as stale, yields `NotFound`.
    pub async fn await_embedding(
        &self,
        token: EmbeddingToken,
        timeout: Duration,
    ) -> Result<Vec<f32>, MemoraError> {
        let Some((_, pending)) = self.shared.pending.remove(&token) else {
            return Err(MemoraError::not_found("embedding token", token.to_string()));
        };
        match tokio::time::timeout(timeout, pending.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(MemoraError::EmbeddingFailed {
                reason: "embedding job was dropped before completion".to_string(),
            }),
            Err(_) => {
                counter!("memora_embedding_timeouts_total").increment(1);
                debug!(%token, timeout_ms = timeout.as_millis() as u64, "embedding await timed out");
                Err(MemoraError::Timeout { duration: timeout })
            }
        }
    }

    /// Enqueues `text` and waits for it with the configured default timeout.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoraError> {
        let token = self.enqueue(text)?;
        self.await_embedding(token, self.shared.settings.await_timeout)
            .await
    }

    /// Schedules an embedding for a stored memory. The vector is written to
    /// the memory row when it arrives; failures are logged, not returned.
    pub fn embed_memory(&self, memory_id: &str, text: &str) -> Result<(), MemoraError> {
        self.submit_write_back(StoredRow::Memory(memory_id.to_string()), text)
    }

    /// Schedules an embedding for a stored chunk; see [`embed_memory`](Self::embed_memory).
    pub fn embed_chunk(&self, chunk_id: &str, text: &str) -> Result<(), MemoraError> {
        self.submit_write_back(StoredRow::Chunk(chunk_id.to_string()), text)
    }

    /// Stops the dispatcher and waits for in-flight batches to finish.
    ///
    /// Jobs still queued are dropped; their callers receive `EmbeddingFailed`.
    /// Later enqueues fail the same way.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        if let Some(handle) = self.dispatcher.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "embedding dispatcher ended abnormally");
            }
        }
        // Bounded by MAX_CONCURRENT_BATCHES in `start`.
        let workers = self.shared.settings.max_concurrent_batches as u32;
        if self.shared.workers.acquire_many(workers).await.is_err() {
            warn!("embedding worker pool closed during shutdown");
        }
        info!("embedding coordinator stopped");
    }

    fn submit_write_back(&self, row: StoredRow, text: &str) -> Result<(), MemoraError> {
        if self.shared.storage.is_none() {
            return Err(MemoraError::Internal(
                "embedding write-back requires a storage adapter".to_string(),
            ));
        }
        validate_text(text)?;
        self.submit(Job {
            text: text.to_string(),
            target: JobTarget::Store(row),
        })
    }

    fn submit(&self, job: Job) -> Result<(), MemoraError> {
        if self.shared.cancel.is_cancelled() {
            return Err(shut_down());
        }
        self.jobs.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => {
                let capacity = self.shared.settings.queue_capacity;
                warn!(capacity, "embedding queue full");
                MemoraError::Overloaded { capacity }
            }
            TrySendError::Closed(_) => shut_down(),
        })
    }
}

fn shut_down() -> MemoraError {
    MemoraError::EmbeddingFailed {
        reason: "embedding coordinator is shut down".to_string(),
    }
}

/// Only the empty string is refused; whitespace is embeddable text.
fn validate_text(text: &str) -> Result<(), MemoraError> {
    if text.is_empty() {
        return Err(MemoraError::validation("text", "must not be empty"));
    }
    Ok(())
}

/// Reduces a provider error to the reason carried by `EmbeddingFailed`.
pub(crate) fn failure_reason(err: MemoraError) -> String {
    match err {
        MemoraError::EmbeddingFailed { reason } => reason,
        other => other.to_string(),
    }
}

async fn dispatch_loop(shared: Arc<Shared>, mut jobs: mpsc::Receiver<Job>) {
    'dispatch: loop {
        let first = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        shared.purge_expired();

        let mut batch = vec![first];
        let deadline = Instant::now() + shared.settings.batch_timeout;
        while batch.len() < shared.settings.batch_size {
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break 'dispatch,
                next = tokio::time::timeout_at(deadline, jobs.recv()) => match next {
                    Ok(Some(job)) => batch.push(job),
                    Ok(None) | Err(_) => break,
                },
            }
        }

        // Backpressure: the next batch is not drained until a worker is free.
        let permit = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break 'dispatch,
            permit = Arc::clone(&shared.workers).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break 'dispatch,
            },
        };
        let worker = Arc::clone(&shared);
        tokio::spawn(async move {
            let _permit = permit;
            worker.process_batch(batch).await;
        });
    }

    jobs.close();
    let mut dropped = 0usize;
    while jobs.try_recv().is_ok() {
        dropped += 1;
    }
    debug!(dropped, "embedding dispatcher stopped");
}

impl Shared {
    async fn process_batch(self: Arc<Self>, batch: Vec<Job>) {
        let size = batch.len();
        let mut groups: HashMap<String, Vec<JobTarget>> = HashMap::new();
        for job in batch {
            groups.entry(job.text).or_default().push(job.target);
        }
        let unique = groups.len();

        counter!("memora_embedding_batches_total").increment(1);
        counter!("memora_embedding_dedup_hits_total").increment((size - unique) as u64);
        debug!(size, unique, "dispatching embedding batch");

        let work = groups.into_iter().map(|(text, targets)| {
            let shared = Arc::clone(&self);
            async move {
                let outcome = shared.embed_one(&text).await;
                shared.deliver(&text, targets, outcome).await;
            }
        });
        futures::future::join_all(work).await;
    }

    /// One provider call, isolated in its own task so a panic fails only
    /// this text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, String> {
        counter!("memora_embedding_provider_calls_total").increment(1);
        let provider = Arc::clone(&self.provider);
        let model = self.settings.model.clone();
        let owned = text.to_string();
        let joined = tokio::spawn(async move { provider.embed(&owned, &model).await }).await;

        let expected = self.settings.dimension;
        match joined {
            Ok(Ok(vector)) if vector.len() == expected => Ok(vector),
            Ok(Ok(vector)) => Err(format!(
                "provider returned {} dimensions, expected {expected}",
                vector.len()
            )),
            Ok(Err(e)) => Err(failure_reason(e)),
            Err(e) if e.is_panic() => Err("embedding provider panicked".to_string()),
            Err(e) => Err(format!("embedding task failed: {e}")),
        }
    }

    async fn deliver(
        &self,
        text: &str,
        targets: Vec<JobTarget>,
        outcome: Result<Vec<f32>, String>,
    ) {
        if let Err(reason) = &outcome {
            warn!(
                %reason,
                chars = text.chars().count(),
                jobs = targets.len(),
                "embedding failed"
            );
        }
        for target in targets {
            match target {
                JobTarget::Reply(tx) => {
                    let result = outcome
                        .clone()
                        .map_err(|reason| MemoraError::EmbeddingFailed { reason });
                    if tx.send(result).is_err() {
                        debug!("embedding caller gone; result discarded");
                    }
                }
                JobTarget::Store(row) => self.write_back(&row, &outcome).await,
            }
        }
    }

    async fn write_back(&self, row: &StoredRow, outcome: &Result<Vec<f32>, String>) {
        let (Ok(vector), Some(storage)) = (outcome, &self.storage) else {
            return;
        };
        let (entity, id, written) = match row {
            StoredRow::Memory(id) => (
                "memory",
                id,
                storage.update_memory_embedding(id, vector).await,
            ),
            StoredRow::Chunk(id) => (
                "chunk",
                id,
                storage.update_chunk_embedding(id, vector).await,
            ),
        };
        match written {
            Ok(()) => debug!(entity, id = id.as_str(), "embedding written back"),
            Err(e) => warn!(entity, id = id.as_str(), error = %e, "embedding write-back failed"),
        }
    }

    fn purge_expired(&self) {
        let ttl = self.settings.pending_ttl;
        let before = self.pending.len();
        self.pending.retain(|_, p| p.enqueued_at.elapsed() < ttl);
        let purged = before.saturating_sub(self.pending.len());
        if purged > 0 {
            debug!(purged, "dropped stale embedding tokens");
        }
    }
}
