// src/api/handlers.rs

use crate::api::{types::*, ApiState};
use crate::core::types::{SessionHistory, SessionSummary};
use crate::infra::errors::{ErrorKind, RepoChatError};
use crate::ingest::redact_location;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a domain error onto a status code and JSON body.
pub fn api_error(err: RepoChatError) -> ApiError {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::InvalidRequest | ErrorKind::MissingCredential => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::SessionExpired => StatusCode::CONFLICT,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("{}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: kind.as_str().to_string(),
            retriable: err.is_retriable(),
        }),
    )
}

/// Unwrap a JSON body, reporting malformed input as `invalid_request`.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| api_error(RepoChatError::InvalidRequest(rejection.body_text())))
}

fn session_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| api_error(RepoChatError::InvalidRequest(rejection.body_text())))
}

/// POST /ingest — Clone (or reuse) a repository and open a chat session.
pub async fn ingest(
    State(state): State<ApiState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let body = json_body(payload)?;
    tracing::info!("Ingesting {}", redact_location(body.repo_url.trim()));

    let created = state
        .coordinator
        .create(&body.repo_url, body.api_key.as_deref())
        .await
        .map_err(api_error)?;

    let message = if created.cached {
        "Repository loaded from cache and ready.".to_string()
    } else {
        format!(
            "Repository ingested and analyzed ({} files).",
            created.file_count
        )
    };

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            session_id: created.session_id,
            status: "success".into(),
            message,
        }),
    ))
}

/// POST /chat — Send one message to a live session.
pub async fn chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let body = json_body(payload)?;
    let reply = state
        .coordinator
        .converse(body.session_id, &body.message)
        .await
        .map_err(api_error)?;
    Ok(Json(ChatReply { reply }))
}

/// GET /sessions — All durable sessions, newest first.
pub async fn list_sessions(
    State(state): State<ApiState>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let sessions = state.coordinator.list().await.map_err(api_error)?;
    Ok(Json(sessions))
}

/// GET /sessions/{id} — Persisted history of one session.
pub async fn get_session(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SessionHistory>, ApiError> {
    let id = session_id(id)?;
    let history = state.coordinator.inspect(id).await.map_err(api_error)?;
    Ok(Json(history))
}

/// DELETE /sessions/{id} — Remove a session and its messages.
pub async fn delete_session(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = session_id(id)?;
    state.coordinator.destroy(id).await.map_err(api_error)?;
    Ok(Json(DeleteResponse {
        session_id: id,
        status: "deleted".into(),
    }))
}

/// GET /health — Liveness check.
pub async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "live_sessions": state.coordinator.registry().len(),
    }))
}
