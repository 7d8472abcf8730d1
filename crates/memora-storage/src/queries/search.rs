// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Nearest-neighbor ranking over chunk embeddings.
//!
//! Similarity is computed inside SQLite with `sqlite-vec`'s
//! `vec_distance_cosine`, so candidates never leave the writer thread until
//! they have been filtered and truncated.

use memora_core::{ChunkMatch, ChunkScope, ChunkSearch, MemoraError, MemoryKind};
use rusqlite::ToSql;

use crate::database::{Database, map_tr_err};
use crate::models::{enum_column, vec_to_blob};

/// Ranks embedded chunks by `1 - cosine_distance`, best first.
///
/// Chunks scoring below `search.threshold` are dropped and at most
/// `search.limit` are returned. Equal scores are ordered by chunk id.
/// A query vector whose dimension differs from the stored vectors makes
/// `vec_distance_cosine` raise, which surfaces as a storage error.
pub async fn search_chunks(
    db: &Database,
    search: &ChunkSearch,
) -> Result<Vec<ChunkMatch>, MemoraError> {
    if search.limit == 0 {
        return Ok(Vec::new());
    }

    let (scope_clause, session_id) = match &search.scope {
        ChunkScope::Global => ("m.session_id IS NULL", None),
        ChunkScope::Session(id) => ("m.session_id = ?4", Some(id.clone())),
        ChunkScope::SessionWithGlobal(id) => {
            ("(m.session_id IS NULL OR m.session_id = ?4)", Some(id.clone()))
        }
    };
    let sql = format!(
        "SELECT chunk_id, text, memory_id, kind, session_id, score FROM (
             SELECT c.id AS chunk_id,
                    c.text AS text,
                    c.memory_id AS memory_id,
                    m.kind AS kind,
                    m.session_id AS session_id,
                    1.0 - vec_distance_cosine(c.embedding, ?1) AS score
             FROM memory_chunks c
             JOIN memories m ON m.id = c.memory_id
             WHERE c.embedding IS NOT NULL AND {scope_clause}
         )
         WHERE score >= ?2
         ORDER BY score DESC, chunk_id ASC
         LIMIT ?3"
    );

    let query = vec_to_blob(&search.embedding);
    let threshold = search.threshold;
    let limit = i64::try_from(search.limit).unwrap_or(i64::MAX);

    db.connection()
        .call(move |conn| -> Result<Vec<ChunkMatch>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let mut bound: Vec<&dyn ToSql> = vec![&query, &threshold, &limit];
            if let Some(id) = &session_id {
                bound.push(id);
            }
            let matches = stmt
                .query_map(bound.as_slice(), |row| {
                    Ok(ChunkMatch {
                        chunk_id: row.get(0)?,
                        text: row.get(1)?,
                        memory_id: row.get(2)?,
                        kind: enum_column::<MemoryKind>(row, 3)?,
                        session_id: row.get(4)?,
                        score: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(matches)
        })
        .await
        .map_err(map_tr_err)
}
