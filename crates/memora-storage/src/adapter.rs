// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use memora_config::model::StorageConfig;
use memora_core::{
    AdapterType, ChunkMatch, ChunkSearch, HealthStatus, Memory, MemoraError, MemoryChunk,
    Message, Metadata, PluginAdapter, Session, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::models::StorageStats;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, MemoraError> {
        self.db.get().ok_or_else(|| MemoraError::Storage {
            source: "storage not initialized; call initialize() first".into(),
        })
    }

    /// Row counts for diagnostics.
    pub async fn stats(&self) -> Result<StorageStats, MemoraError> {
        self.db()?.stats().await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MemoraError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MemoraError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), MemoraError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MemoraError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MemoraError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Sessions ---

    async fn create_session(&self, session: &Session) -> Result<(), MemoraError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, MemoraError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn get_session_by_name(&self, name: &str) -> Result<Option<Session>, MemoraError> {
        queries::sessions::get_session_by_name(self.db()?, name).await
    }

    async fn get_or_create_session(
        &self,
        name: &str,
        metadata: &Metadata,
    ) -> Result<Session, MemoraError> {
        queries::sessions::get_or_create_session(self.db()?, name, metadata).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, MemoraError> {
        queries::sessions::list_sessions(self.db()?).await
    }

    async fn delete_session(&self, id: &str) -> Result<bool, MemoraError> {
        queries::sessions::delete_session(self.db()?, id).await
    }

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), MemoraError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, MemoraError> {
        queries::messages::get_recent_messages(self.db()?, session_id, limit).await
    }

    async fn count_messages(&self, session_id: &str) -> Result<u64, MemoraError> {
        queries::messages::count_messages(self.db()?, session_id).await
    }

    async fn delete_messages_for_session(&self, session_id: &str) -> Result<u64, MemoraError> {
        queries::messages::delete_messages_for_session(self.db()?, session_id).await
    }

    // --- Memories and chunks ---

    async fn insert_memory_with_chunks(
        &self,
        memory: &Memory,
        chunks: &[MemoryChunk],
    ) -> Result<(), MemoraError> {
        queries::memories::insert_memory_with_chunks(self.db()?, memory, chunks).await
    }

    async fn get_memory(&self, id: &str) -> Result<Option<Memory>, MemoraError> {
        queries::memories::get_memory(self.db()?, id).await
    }

    async fn list_memories(&self, session_id: Option<&str>) -> Result<Vec<Memory>, MemoraError> {
        queries::memories::list_memories(self.db()?, session_id).await
    }

    async fn delete_memory(&self, id: &str) -> Result<bool, MemoraError> {
        queries::memories::delete_memory(self.db()?, id).await
    }

    async fn update_memory_embedding(
        &self,
        id: &str,
        embedding: &[f32],
    ) -> Result<(), MemoraError> {
        queries::memories::update_memory_embedding(self.db()?, id, embedding).await
    }

    async fn get_chunks_for_memory(
        &self,
        memory_id: &str,
    ) -> Result<Vec<MemoryChunk>, MemoraError> {
        queries::memories::get_chunks_for_memory(self.db()?, memory_id).await
    }

    async fn update_chunk_embedding(
        &self,
        id: &str,
        embedding: &[f32],
    ) -> Result<(), MemoraError> {
        queries::memories::update_chunk_embedding(self.db()?, id, embedding).await
    }

    // --- Similarity ---

    async fn search_chunks(&self, search: &ChunkSearch) -> Result<Vec<ChunkMatch>, MemoraError> {
        queries::search::search_chunks(self.db()?, search).await
    }
}
