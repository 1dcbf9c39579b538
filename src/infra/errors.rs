// src/infra/errors.rs — Error types for repochat

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoChatError {
    // Input errors (never retried)
    #[error("No API key supplied. Pass `api_key` or set {env_var}.")]
    MissingCredential { env_var: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Lookup
    #[error("Session {id} not found")]
    SessionNotFound { id: i64 },

    /// The durable session exists but its live conversation is gone
    /// (process restarted). Only a fresh ingest can recover.
    #[error("Session {id} expired from memory. Re-ingest the repository to keep chatting.")]
    SessionExpired { id: i64 },

    // Upstream errors (reported verbatim)
    #[error("Failed to clone '{location}': {message}")]
    Clone { location: String, message: String },

    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used by the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    MissingCredential,
    NotFound,
    SessionExpired,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::NotFound => "not_found",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Internal => "internal",
        }
    }
}

impl RepoChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoChatError::MissingCredential { .. } => ErrorKind::MissingCredential,
            RepoChatError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            RepoChatError::SessionNotFound { .. } => ErrorKind::NotFound,
            RepoChatError::SessionExpired { .. } => ErrorKind::SessionExpired,
            RepoChatError::Clone { .. }
            | RepoChatError::Provider { .. }
            | RepoChatError::RateLimited { .. } => ErrorKind::Upstream,
            RepoChatError::Database(_)
            | RepoChatError::Config(_)
            | RepoChatError::Io(_)
            | RepoChatError::Other(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            RepoChatError::Provider {
                retriable: true,
                ..
            } | RepoChatError::RateLimited { .. }
        )
    }
}
