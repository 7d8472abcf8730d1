// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory and chunk operations.

use memora_core::{Memory, MemoraError, MemoryChunk, MemoryKind};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{embedding_column, enum_column, metadata_column, metadata_to_text, vec_to_blob};

const MEMORY_COLUMNS: &str = "id, kind, text, metadata, embedding, session_id, created_at";
const CHUNK_COLUMNS: &str = "id, memory_id, text, embedding, created_at";

fn row_to_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    Ok(Memory {
        id: row.get(0)?,
        kind: enum_column::<MemoryKind>(row, 1)?,
        text: row.get(2)?,
        metadata: metadata_column(row, 3)?,
        embedding: embedding_column(row, 4)?,
        session_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryChunk> {
    Ok(MemoryChunk {
        id: row.get(0)?,
        memory_id: row.get(1)?,
        text: row.get(2)?,
        embedding: embedding_column(row, 3)?,
        created_at: row.get(4)?,
    })
}

/// Inserts a memory and its chunks in one transaction. Any failing insert
/// rolls back the whole unit.
pub async fn insert_memory_with_chunks(
    db: &Database,
    memory: &Memory,
    chunks: &[MemoryChunk],
) -> Result<(), MemoraError> {
    let memory = memory.clone();
    let chunks = chunks.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO memories (id, kind, text, metadata, embedding, session_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    memory.id,
                    memory.kind.as_str(),
                    memory.text,
                    metadata_to_text(&memory.metadata),
                    memory.embedding.as_deref().map(vec_to_blob),
                    memory.session_id,
                    memory.created_at,
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO memory_chunks (id, memory_id, text, embedding, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for chunk in &chunks {
                    stmt.execute(params![
                        chunk.id,
                        chunk.memory_id,
                        chunk.text,
                        chunk.embedding.as_deref().map(vec_to_blob),
                        chunk.created_at,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_memory(db: &Database, id: &str) -> Result<Option<Memory>, MemoraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Memory>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                params![id],
                row_to_memory,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Memories owned by `session_id`, or global memories when `None`, newest first.
pub async fn list_memories(
    db: &Database,
    session_id: Option<&str>,
) -> Result<Vec<Memory>, MemoraError> {
    let session_id = session_id.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Vec<Memory>, rusqlite::Error> {
            // `IS` matches NULL against NULL, so one statement covers both scopes.
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEMORY_COLUMNS} FROM memories
                 WHERE session_id IS ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let memories = stmt
                .query_map(params![session_id], row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(memories)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a memory; its chunks cascade.
pub async fn delete_memory(db: &Database, id: &str) -> Result<bool, MemoraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            Ok(conn.execute("DELETE FROM memories WHERE id = ?1", params![id])? > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_memory_embedding(
    db: &Database,
    id: &str,
    embedding: &[f32],
) -> Result<(), MemoraError> {
    let owned_id = id.to_string();
    let blob = vec_to_blob(embedding);
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE memories SET embedding = ?1 WHERE id = ?2",
                params![blob, owned_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(MemoraError::not_found("memory", id));
    }
    Ok(())
}

/// Chunks of a memory in the order they were produced.
pub async fn get_chunks_for_memory(
    db: &Database,
    memory_id: &str,
) -> Result<Vec<MemoryChunk>, MemoraError> {
    let memory_id = memory_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryChunk>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHUNK_COLUMNS} FROM memory_chunks WHERE memory_id = ?1 ORDER BY rowid ASC"
            ))?;
            let chunks = stmt
                .query_map(params![memory_id], row_to_chunk)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(chunks)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_chunk_embedding(
    db: &Database,
    id: &str,
    embedding: &[f32],
) -> Result<(), MemoraError> {
    let owned_id = id.to_string();
    let blob = vec_to_blob(embedding);
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE memory_chunks SET embedding = ?1 WHERE id = ?2",
                params![blob, owned_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(MemoraError::not_found("chunk", id));
    }
    Ok(())
}
