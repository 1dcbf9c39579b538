// src/api/types.rs

use serde::{Deserialize, Serialize};

/// Request body for ingesting a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    #[serde(alias = "location")]
    pub repo_url: String,
    /// Optional; falls back to the server's configured environment variable.
    #[serde(default, alias = "credential")]
    pub api_key: Option<String>,
}

/// Response for a created session.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub session_id: i64,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub session_id: i64,
    pub status: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    /// True when the same request may succeed if sent again later.
    pub retriable: bool,
}
