// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary SQLite storage for integration tests.

use std::sync::Arc;

use memora_config::model::StorageConfig;
use memora_core::{MemoraError, StorageAdapter};
use memora_storage::SqliteStorage;
use tempfile::TempDir;

/// An initialized [`SqliteStorage`] living in a temp directory.
///
/// The directory (and database) is removed when this value is dropped, so
/// keep it alive for the duration of the test.
pub struct TempStorage {
    pub storage: Arc<SqliteStorage>,
    _dir: TempDir,
}

impl TempStorage {
    /// Create and migrate a fresh database.
    pub async fn new() -> Result<Self, MemoraError> {
        let dir = TempDir::new().map_err(|e| MemoraError::Storage { source: e.into() })?;
        let config = StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(config);
        storage.initialize().await?;
        Ok(Self {
            storage: Arc::new(storage),
            _dir: dir,
        })
    }

    /// The storage as a trait object, as services consume it.
    pub fn adapter(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }
}
