// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD operations.

use memora_core::{Metadata, MemoraError, Session, new_id, timestamp_now};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{metadata_column, metadata_to_text};

const SESSION_COLUMNS: &str = "id, name, metadata, created_at";

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        name: row.get(1)?,
        metadata: metadata_column(row, 2)?,
        created_at: row.get(3)?,
    })
}

/// Insert a new session. Fails if the id or name is already taken.
pub async fn create_session(db: &Database, session: &Session) -> Result<(), MemoraError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO sessions (id, name, metadata, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.id,
                    session.name,
                    metadata_to_text(&session.metadata),
                    session.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, MemoraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Session>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_session_by_name(
    db: &Database,
    name: &str,
) -> Result<Option<Session>, MemoraError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Session>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE name = ?1"),
                params![name],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Returns the session with `name`, inserting it first if absent.
///
/// The insert and read run on the writer thread back to back, so two
/// concurrent callers always observe the same row.
pub async fn get_or_create_session(
    db: &Database,
    name: &str,
    metadata: &Metadata,
) -> Result<Session, MemoraError> {
    let name = name.to_string();
    let metadata = metadata_to_text(metadata);
    db.connection()
        .call(move |conn| -> Result<Session, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO sessions (id, name, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![new_id(), name, metadata, timestamp_now()],
            )?;
            let session = tx.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE name = ?1"),
                params![name],
                row_to_session,
            )?;
            tx.commit()?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// All sessions, oldest first.
pub async fn list_sessions(db: &Database) -> Result<Vec<Session>, MemoraError> {
    db.connection()
        .call(|conn| -> Result<Vec<Session>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at ASC, rowid ASC"
            ))?;
            let sessions = stmt
                .query_map([], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a session. Messages cascade; owned memories become global.
pub async fn delete_session(db: &Database, id: &str) -> Result<bool, MemoraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}
