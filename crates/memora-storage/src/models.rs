// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Column encodings and row helpers shared by the query modules.

use std::str::FromStr;

use rusqlite::types::Type;
use serde::Serialize;

use memora_core::Metadata;

/// Convert an f32 vector to a little-endian BLOB, the layout `sqlite-vec`
/// reads natively.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a BLOB back to an f32 vector. Trailing bytes that do not form a
/// whole float are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Row counts reported by `memora doctor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub sessions: u64,
    pub messages: u64,
    pub memories: u64,
    pub chunks: u64,
    /// Chunks still waiting for a deferred embedding.
    pub unembedded_chunks: u64,
}

pub(crate) fn metadata_to_text(metadata: &Metadata) -> String {
    serde_json::Value::Object(metadata.clone()).to_string()
}

/// Reads a JSON object column.
pub(crate) fn metadata_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Metadata> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn json_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<serde_json::Value> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a text column holding a strum enum (role, kind).
pub(crate) fn enum_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e: T::Err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn embedding_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<Vec<f32>>> {
    let blob: Option<Vec<u8>> = row.get(idx)?;
    Ok(blob.map(|b| blob_to_vec(&b)))
}
