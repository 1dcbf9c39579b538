// src/core/coordinator.rs — Session lifecycle: durable rows vs live handles
//
// Per session id the coordinator sees one of:
//   absent       no row, no handle
//   live         row + handle (created during this process)
//   durable-only row, no handle (process restarted since)
// Deletion returns an id to absent.

use std::sync::Arc;

use crate::conversation::{Conversation, ConversationOptions};
use crate::core::registry::SessionRegistry;
use crate::core::types::{
    HistoryMessage, MessageRole, SessionCreated, SessionHistory, SessionState, SessionSummary,
};
use crate::infra::config::ModelConfig;
use crate::infra::errors::RepoChatError;
use crate::ingest::{self, Ingestor};
use crate::memory::StoreHandle;
use crate::provider::Connector;

pub struct SessionCoordinator {
    store: StoreHandle,
    registry: Arc<SessionRegistry>,
    ingestor: Arc<dyn Ingestor>,
    connector: Arc<dyn Connector>,
    model: ModelConfig,
}

impl SessionCoordinator {
    pub fn new(
        store: StoreHandle,
        registry: Arc<SessionRegistry>,
        ingestor: Arc<dyn Ingestor>,
        connector: Arc<dyn Connector>,
        model: ModelConfig,
    ) -> Self {
        Self {
            store,
            registry,
            ingestor,
            connector,
            model,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Request key if given, else the configured environment variable.
    fn resolve_credential(&self, supplied: Option<&str>) -> Result<String, RepoChatError> {
        if let Some(key) = supplied.map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        std::env::var(&self.model.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RepoChatError::MissingCredential {
                env_var: self.model.api_key_env.clone(),
            })
    }

    fn conversation_options(&self) -> ConversationOptions {
        ConversationOptions {
            model: self.model.model.clone(),
            max_tokens: self.model.max_output_tokens,
            temperature: self.model.temperature,
        }
    }

    /// absent → live. Reuses the cached artifact when the location has been
    /// ingested before; always creates a new session and a new live handle.
    pub async fn create(
        &self,
        location: &str,
        credential: Option<&str>,
    ) -> Result<SessionCreated, RepoChatError> {
        let api_key = self.resolve_credential(credential)?;
        let location = ingest::validate_location(location)?;

        let (repository_id, context, file_count, cached) =
            match self.store.find_repository(&location).await? {
                Some(repo) => {
                    tracing::info!(
                        repository_id = repo.id,
                        "Using cached artifact for {}",
                        ingest::redact_location(&location)
                    );
                    (repo.id, repo.context_text, repo.file_count, true)
                }
                None => {
                    let artifact = self.ingestor.ingest(&location).await?;
                    let file_count = artifact.file_count as i64;
                    let id = self
                        .store
                        .insert_repository(location.clone(), artifact.text.clone(), file_count)
                        .await?;
                    (id, artifact.text, file_count, false)
                }
            };

        let session_id = self.store.insert_session(repository_id).await?;

        let provider = self.connector.connect(&api_key);
        let conversation =
            Conversation::open(provider, self.conversation_options(), &context, &[]);
        let provider_id = conversation.provider_id().to_string();
        self.registry.register(session_id, conversation);

        tracing::info!(session_id, repository_id, cached, provider = %provider_id, "Session created");

        Ok(SessionCreated {
            session_id,
            repository_id,
            cached,
            file_count,
        })
    }

    /// live → live, or a reconciliation error for durable-only sessions.
    ///
    /// The user message is persisted before the model is asked and is kept
    /// if the model call fails. Nothing is persisted when the session has no
    /// live handle. The handle stays locked until the reply is stored, so a
    /// concurrent `destroy` waits for the turn to finish.
    pub async fn converse(&self, session_id: i64, message: &str) -> Result<String, RepoChatError> {
        if message.trim().is_empty() {
            return Err(RepoChatError::InvalidRequest(
                "message cannot be empty".into(),
            ));
        }

        if self.store.get_session(session_id).await?.is_none() {
            return Err(RepoChatError::SessionNotFound { id: session_id });
        }

        let Some(handle) = self.registry.get(session_id) else {
            tracing::warn!(session_id, "Chat on a session with no live conversation");
            return Err(RepoChatError::SessionExpired { id: session_id });
        };

        let mut conversation = handle.lock().await;

        if let Err(e) = self
            .store
            .insert_message(session_id, MessageRole::User, message.to_string())
            .await
        {
            return Err(self.classify_write_error(session_id, e).await);
        }

        let reply = match conversation.send(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(session_id, "Model call failed: {}", e);
                return Err(e);
            }
        };

        if let Err(e) = self
            .store
            .insert_message(session_id, MessageRole::Model, reply.clone())
            .await
        {
            return Err(self.classify_write_error(session_id, e).await);
        }

        tracing::debug!(session_id, reply_len = reply.len(), "Exchange persisted");
        Ok(reply)
    }

    /// A write against a session that was deleted mid-turn is reported as
    /// not-found; anything else stays an internal error.
    async fn classify_write_error(&self, session_id: i64, err: anyhow::Error) -> RepoChatError {
        match self.store.get_session(session_id).await {
            Ok(None) => {
                tracing::info!(session_id, "Session deleted during an exchange");
                RepoChatError::SessionNotFound { id: session_id }
            }
            _ => RepoChatError::Other(err),
        }
    }

    /// Persisted history in creation order. Works with or without a live
    /// handle.
    pub async fn inspect(&self, session_id: i64) -> Result<SessionHistory, RepoChatError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(RepoChatError::SessionNotFound { id: session_id })?;

        let messages = self
            .store
            .query_messages(session_id)
            .await?
            .into_iter()
            .map(|m| HistoryMessage {
                role: m.role,
                text: m.text,
                created_at: m.created_at,
            })
            .collect();

        Ok(SessionHistory {
            session_id,
            repo_url: session.repo_url,
            created_at: session.created_at,
            live: self.registry.contains(session_id),
            messages,
        })
    }

    /// Every durable session, newest first.
    pub async fn list(&self) -> Result<Vec<SessionSummary>, RepoChatError> {
        let rows = self.store.list_sessions().await?;
        Ok(rows
            .into_iter()
            .map(|r| SessionSummary {
                live: self.registry.contains(r.id),
                session_id: r.id,
                repo_url: r.repo_url,
                created_at: r.created_at,
                message_count: r.message_count,
            })
            .collect())
    }

    /// live | durable-only → absent. Removes messages, the session row and
    /// the live handle. An exchange already in flight finishes first.
    pub async fn destroy(&self, session_id: i64) -> Result<(), RepoChatError> {
        let handle = self.registry.get(session_id);
        let _turn = match handle {
            Some(ref h) => Some(h.lock().await),
            None => None,
        };

        let removed = self.store.delete_session(session_id).await?;
        let had_handle = self.registry.remove(session_id);

        if !removed {
            return Err(RepoChatError::SessionNotFound { id: session_id });
        }
        tracing::info!(session_id, had_handle, "Session deleted");
        Ok(())
    }

    pub async fn state(&self, session_id: i64) -> Result<SessionState, RepoChatError> {
        if self.store.get_session(session_id).await?.is_none() {
            return Ok(SessionState::Absent);
        }
        Ok(if self.registry.contains(session_id) {
            SessionState::Live
        } else {
            SessionState::DurableOnly
        })
    }

    /// Drop all live handles. Durable sessions become durable-only.
    pub fn shutdown(&self) {
        let dropped = self.registry.clear();
        tracing::info!(dropped, "Live conversations released");
    }
}
