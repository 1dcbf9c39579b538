// src/core/types.rs — Core domain types

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Which party authored a persisted chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Model => "model",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "model" => Some(MessageRole::Model),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for MessageRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MessageRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        MessageRole::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown role '{s}'").into()))
    }
}

/// Where a session id stands from the coordinator's point of view.
///
/// Deleted sessions are indistinguishable from never-created ones and
/// report `Absent`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Absent,
    /// Durable row and live conversation handle both exist.
    Live,
    /// Durable row exists but the live handle is gone.
    DurableOnly,
}

/// Result of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCreated {
    pub session_id: i64,
    pub repository_id: i64,
    /// True when the artifact came from the repository cache (no clone).
    pub cached: bool,
    pub file_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: i64,
    pub repo_url: String,
    pub created_at: String,
    pub message_count: i64,
    pub live: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionHistory {
    pub session_id: i64,
    pub repo_url: String,
    pub created_at: String,
    pub live: bool,
    pub messages: Vec<HistoryMessage>,
}
