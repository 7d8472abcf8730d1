// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::sync::Once;

use memora_core::MemoraError;
use tokio_rusqlite::Connection;
use tracing::debug;

static VEC_EXTENSION: Once = Once::new();

/// Registers `sqlite-vec` as an auto-extension so every connection opened
/// afterwards has `vec_distance_cosine` available.
fn register_vec_extension() {
    VEC_EXTENSION.call_once(|| {
        // SAFETY: sqlite3_vec_init has the signature sqlite expects of an
        // extension entry point; registration happens once, before any
        // connection is opened by this process.
        #[allow(clippy::missing_transmute_annotations)]
        unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }
    });
}

/// Converts a tokio-rusqlite failure into a storage error.
pub(crate) fn map_tr_err(e: impl std::fmt::Display) -> MemoraError {
    MemoraError::storage(e)
}

/// Handle to the single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, MemoraError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, MemoraError> {
        register_vec_extension();

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MemoraError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path).await.map_err(map_tr_err)?;

        let journal = if wal_mode { "WAL" } else { "DELETE" };
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;"
            ))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<Result<(), MemoraError>, rusqlite::Error> {
            Ok(crate::migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection. All query modules go through it.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), MemoraError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Row counts for each entity table.
    pub async fn stats(&self) -> Result<crate::models::StorageStats, MemoraError> {
        self.conn
            .call(|conn| -> Result<crate::models::StorageStats, rusqlite::Error> {
                let count = |sql: &str| -> Result<u64, rusqlite::Error> {
                    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                    Ok(n as u64)
                };
                Ok(crate::models::StorageStats {
                    sessions: count("SELECT COUNT(*) FROM sessions")?,
                    messages: count("SELECT COUNT(*) FROM messages")?,
                    memories: count("SELECT COUNT(*) FROM memories")?,
                    chunks: count("SELECT COUNT(*) FROM memory_chunks")?,
                    unembedded_chunks: count(
                        "SELECT COUNT(*) FROM memory_chunks WHERE embedding IS NULL",
                    )?,
                })
            })
            .await
            .map_err(map_tr_err)
    }

    /// Closes the connection. Later calls through clones of this handle fail.
    pub async fn close(self) -> Result<(), MemoraError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}
