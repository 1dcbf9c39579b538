// src/memory/store.rs — SQLite operations

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::types::MessageRole;

/// Fixed-width UTC timestamp so that string order is chronological order.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Low-level SQLite operations for repositories, sessions and messages.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // -- Repositories --

    pub fn find_repository(&self, url: &str) -> anyhow::Result<Option<RepositoryRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, url, context_text, file_count, processed_at
                 FROM repositories WHERE url = ?1",
                params![url],
                |row| {
                    Ok(RepositoryRow {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        context_text: row.get(2)?,
                        file_count: row.get(3)?,
                        processed_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Insert a repository row. If another request cached the same url first,
    /// the existing row wins and its id is returned.
    pub fn insert_repository(
        &self,
        url: &str,
        context_text: &str,
        file_count: i64,
    ) -> anyhow::Result<i64> {
        self.conn.execute(
            "INSERT INTO repositories (url, context_text, file_count, processed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO NOTHING",
            params![url, context_text, file_count, timestamp_now()],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM repositories WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn count_repositories(&self) -> anyhow::Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))?;
        Ok(count)
    }

    // -- Sessions --

    pub fn insert_session(&self, repository_id: i64) -> anyhow::Result<i64> {
        self.conn.execute(
            "INSERT INTO chat_sessions (repository_id, created_at) VALUES (?1, ?2)",
            params![repository_id, timestamp_now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_session(&self, id: i64) -> anyhow::Result<Option<SessionRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT s.id, s.repository_id, r.url, s.created_at
                 FROM chat_sessions s JOIN repositories r ON r.id = s.repository_id
                 WHERE s.id = ?1",
                params![id],
                |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        repository_id: row.get(1)?,
                        repo_url: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// All sessions with their message counts, newest first.
    pub fn list_sessions(&self) -> anyhow::Result<Vec<SessionSummaryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, r.url, s.created_at,
                    (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id)
             FROM chat_sessions s JOIN repositories r ON r.id = s.repository_id
             ORDER BY s.created_at DESC, s.id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SessionSummaryRow {
                id: row.get(0)?,
                repo_url: row.get(1)?,
                created_at: row.get(2)?,
                message_count: row.get(3)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Delete a session and its messages. Messages go first, explicitly, in
    /// the same transaction. Returns false if the session did not exist.
    pub fn delete_session(&self, id: i64) -> anyhow::Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM chat_messages WHERE session_id = ?1",
            params![id],
        )?;
        let removed = tx.execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        session_id: i64,
        role: MessageRole,
        text: &str,
    ) -> anyhow::Result<i64> {
        self.conn.execute(
            "INSERT INTO chat_messages (session_id, role, text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, role, text, timestamp_now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Messages of one session in conversational order.
    pub fn query_messages(&self, session_id: i64) -> anyhow::Result<Vec<MessageRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, role, text, created_at
             FROM chat_messages WHERE session_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                session_id: row.get(1)?,
                role: row.get(2)?,
                text: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_messages(&self, session_id: i64) -> anyhow::Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chat_messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// -- Row types --

#[derive(Debug, Clone)]
pub struct RepositoryRow {
    pub id: i64,
    pub url: String,
    pub context_text: String,
    pub file_count: i64,
    pub processed_at: String,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub repository_id: i64,
    pub repo_url: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct SessionSummaryRow {
    pub id: i64,
    pub repo_url: String,
    pub created_at: String,
    pub message_count: i64,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub session_id: i64,
    pub role: MessageRole,
    pub text: String,
    pub created_at: String,
}
