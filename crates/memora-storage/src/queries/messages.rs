// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations. Messages are append-only; the only mutation besides
//! insert is clearing a session's history.

use memora_core::{MemoraError, Message, Role};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{enum_column, json_column};

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: enum_column::<Role>(row, 2)?,
        content: json_column(row, 3)?,
        tool_name: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), MemoraError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (id, session_id, role, content, tool_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.session_id,
                    msg.role.as_str(),
                    msg.content.to_string(),
                    msg.tool_name,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` messages of a session, returned oldest first.
///
/// Ties on `created_at` fall back to insertion order.
pub async fn get_recent_messages(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<Message>, MemoraError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let session_id = session_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, role, content, tool_name, created_at FROM (
                     SELECT rowid AS seq, * FROM messages
                     WHERE session_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2
                 ) ORDER BY created_at ASC, seq ASC",
            )?;
            let messages = stmt
                .query_map(params![session_id, limit], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_messages(db: &Database, session_id: &str) -> Result<u64, MemoraError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes every message of a session, returning the number removed.
pub async fn delete_messages_for_session(
    db: &Database,
    session_id: &str,
) -> Result<u64, MemoraError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM messages WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions::get_or_create_session;
    use memora_core::Metadata;
    use tempfile::tempdir;

    async fn setup_db_with_session() -> (Database, String, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("messages.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let session = get_or_create_session(&db, "chat", &Metadata::new())
            .await
            .unwrap();
        (db, session.id, dir)
    }

    fn make_msg(id: &str, session_id: &str, role: Role, text: &str, ts: &str) -> Message {
        Message {
            id: id.to_string(),
            session_id: session_id.to_string(),
            role,
            content: serde_json::json!({ "text": text }),
            tool_name: None,
            created_at: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn recent_messages_are_the_newest_in_chronological_order() {
        let (db, sid, _dir) = setup_db_with_session().await;
        for i in 1..=5 {
            let role = if i % 2 == 1 { Role::User } else { Role::Assistant };
            let msg = make_msg(
                &format!("m{i}"),
                &sid,
                role,
                &format!("turn {i}"),
                &format!("2026-01-01T00:00:0{i}.000000Z"),
            );
            insert_message(&db, &msg).await.unwrap();
        }

        let recent = get_recent_messages(&db, &sid, 3).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m4", "m5"]);
        assert_eq!(recent[0].primary_text(), Some("turn 3"));
        assert_eq!(recent[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn identical_timestamps_keep_insertion_order() {
        let (db, sid, _dir) = setup_db_with_session().await;
        let ts = "2026-01-01T00:00:00.000000Z";
        for id in ["a", "b", "c"] {
            insert_message(&db, &make_msg(id, &sid, Role::User, id, ts))
                .await
                .unwrap();
        }
        let recent = get_recent_messages(&db, &sid, 10).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn tool_messages_round_trip() {
        let (db, sid, _dir) = setup_db_with_session().await;
        let mut msg = make_msg("t1", &sid, Role::Tool, "42", "2026-01-01T00:00:00.000000Z");
        msg.tool_name = Some("calculator".into());
        msg.content = serde_json::json!({ "text": "42", "exit": 0 });
        insert_message(&db, &msg).await.unwrap();

        let stored = get_recent_messages(&db, &sid, 1).await.unwrap();
        assert_eq!(stored, vec![msg]);
    }

    #[tokio::test]
    async fn delete_clears_history_and_reports_count() {
        let (db, sid, _dir) = setup_db_with_session().await;
        for i in 0..4 {
            let msg = Message::text(&sid, Role::User, &format!("m{i}"));
            insert_message(&db, &msg).await.unwrap();
        }
        assert_eq!(count_messages(&db, &sid).await.unwrap(), 4);
        assert_eq!(delete_messages_for_session(&db, &sid).await.unwrap(), 4);
        assert_eq!(count_messages(&db, &sid).await.unwrap(), 0);
        assert!(get_recent_messages(&db, &sid, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_session_is_rejected_by_foreign_key() {
        let (db, _sid, _dir) = setup_db_with_session().await;
        let orphan = Message::text("no-such-session", Role::User, "hi");
        assert!(insert_message(&db, &orphan).await.is_err());
    }

    #[tokio::test]
    async fn zero_limit_returns_nothing() {
        let (db, sid, _dir) = setup_db_with_session().await;
        insert_message(&db, &Message::text(&sid, Role::User, "x"))
            .await
            .unwrap();
        assert!(get_recent_messages(&db, &sid, 0).await.unwrap().is_empty());
    }
}
