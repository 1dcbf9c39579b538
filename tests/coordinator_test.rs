// tests/coordinator_test.rs — Integration test: session lifecycle with mock provider and ingestor

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use repochat::core::types::{MessageRole, SessionState};
use repochat::core::{SessionCoordinator, SessionRegistry};
use repochat::infra::config::ModelConfig;
use repochat::infra::errors::{ErrorKind, RepoChatError};
use repochat::ingest::{Artifact, Ingestor};
use repochat::memory::{in_memory_store, spawn_store_server, StoreHandle};
use repochat::provider::*;

const REPO: &str = "https://example.com/repo.git";

/// Ingestor that counts calls and returns a fixed artifact.
#[derive(Default)]
struct CountingIngestor {
    calls: AtomicUsize,
}

#[async_trait]
impl Ingestor for CountingIngestor {
    async fn ingest(&self, location: &str) -> Result<Artifact, RepoChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Artifact {
            text: format!(
                "Processed 1 files from {location}.\n--- START FILE: src/main.rs ---\nfn main() {{}}\n--- END FILE: src/main.rs ---\n"
            ),
            file_count: 1,
        })
    }
}

/// A mock provider that answers with the number of messages it was sent,
/// or fails while `failing` is set. Each call waits `delay_ms` first.
struct MockProvider {
    failing: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Provider"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, RepoChatError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoChatError::Provider {
                provider: "mock".into(),
                message: "upstream unavailable".into(),
                retriable: true,
            });
        }
        Ok(ChatResponse {
            content: format!("reply after {} messages", request.messages.len()),
            usage: TokenUsage::default(),
            stop_reason: StopReason::EndTurn,
        })
    }
}

struct MockConnector {
    failing: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
    keys: std::sync::Mutex<Vec<String>>,
}

impl Connector for MockConnector {
    fn connect(&self, api_key: &str) -> Arc<dyn ModelProvider> {
        if let Ok(mut keys) = self.keys.lock() {
            keys.push(api_key.to_string());
        }
        Arc::new(MockProvider {
            failing: self.failing.clone(),
            delay_ms: self.delay_ms.clone(),
        })
    }
}

struct Harness {
    store: StoreHandle,
    ingestor: Arc<CountingIngestor>,
    connector: Arc<MockConnector>,
    failing: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
    coordinator: Arc<SessionCoordinator>,
}

impl Harness {
    fn new() -> Self {
        let (store, _join) = spawn_store_server(in_memory_store().unwrap());
        Self::over(store, "REPOCHAT_TEST_KEY_NEVER_SET")
    }

    fn over(store: StoreHandle, api_key_env: &str) -> Self {
        let ingestor = Arc::new(CountingIngestor::default());
        let failing = Arc::new(AtomicBool::new(false));
        let delay_ms = Arc::new(AtomicU64::new(0));
        let connector = Arc::new(MockConnector {
            failing: failing.clone(),
            delay_ms: delay_ms.clone(),
            keys: std::sync::Mutex::new(Vec::new()),
        });
        let coordinator = Arc::new(SessionCoordinator::new(
            store.clone(),
            Arc::new(SessionRegistry::new()),
            ingestor.clone(),
            connector.clone(),
            ModelConfig {
                api_key_env: api_key_env.into(),
                ..Default::default()
            },
        ));
        Self {
            store,
            ingestor,
            connector,
            failing,
            delay_ms,
            coordinator,
        }
    }

    /// A new coordinator over the same database, as after a process restart.
    fn restarted(&self) -> Self {
        Self::over(self.store.clone(), "REPOCHAT_TEST_KEY_NEVER_SET")
    }
}

#[tokio::test]
async fn test_end_to_end_example() {
    let h = Harness::new();

    let created = h.coordinator.create(REPO, Some("test-key")).await.unwrap();
    assert_eq!(created.session_id, 1);
    assert!(!created.cached);
    assert!(h.coordinator.inspect(1).await.unwrap().messages.is_empty());

    let reply = h
        .coordinator
        .converse(1, "What does the main entry point do?")
        .await
        .unwrap();

    let history = h.coordinator.inspect(1).await.unwrap();
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[0].role, MessageRole::User);
    assert_eq!(history.messages[0].text, "What does the main entry point do?");
    assert_eq!(history.messages[1].role, MessageRole::Model);
    assert_eq!(history.messages[1].text, reply);

    let after = h.restarted();
    let err = after.coordinator.converse(1, "And the tests?").await.unwrap_err();
    assert!(matches!(err, RepoChatError::SessionExpired { id: 1 }));
    assert_eq!(err.kind(), ErrorKind::SessionExpired);
    assert_eq!(after.store.count_messages(1).await.unwrap(), 2);
}

#[tokio::test]
async fn test_same_location_reuses_cached_artifact() {
    let h = Harness::new();

    let first = h.coordinator.create(REPO, Some("k")).await.unwrap();
    let second = h.coordinator.create(REPO, Some("k")).await.unwrap();

    assert_eq!(h.ingestor.calls.load(Ordering::SeqCst), 1);
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(first.repository_id, second.repository_id);
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(h.coordinator.registry().len(), 2);
}

#[tokio::test]
async fn test_location_is_trimmed_before_cache_lookup() {
    let h = Harness::new();

    h.coordinator.create(REPO, Some("k")).await.unwrap();
    let again = h
        .coordinator
        .create(&format!("  {REPO}\n"), Some("k"))
        .await
        .unwrap();

    assert!(again.cached);
    assert_eq!(h.ingestor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_successful_exchanges_accumulate_in_order() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;

    let first = h.coordinator.converse(id, "one").await.unwrap();
    let second = h.coordinator.converse(id, "two").await.unwrap();

    // the live handle carries earlier turns: seed pair + one prior exchange + new turn
    assert_eq!(first, "reply after 3 messages");
    assert_eq!(second, "reply after 5 messages");

    let history = h.coordinator.inspect(id).await.unwrap();
    let texts: Vec<&str> = history.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["one", first.as_str(), "two", second.as_str()]);
    assert!(history
        .messages
        .windows(2)
        .all(|w| w[0].created_at <= w[1].created_at));
    assert_eq!(
        h.store.count_messages(id).await.unwrap() as usize,
        history.messages.len()
    );
}

#[tokio::test]
async fn test_failed_remote_call_keeps_user_message() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;

    h.failing.store(true, Ordering::SeqCst);
    let err = h.coordinator.converse(id, "lost reply").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);

    let history = h.coordinator.inspect(id).await.unwrap();
    assert_eq!(history.messages.len(), 1);
    assert_eq!(history.messages[0].role, MessageRole::User);

    // the handle is still usable once the upstream recovers
    h.failing.store(false, Ordering::SeqCst);
    let reply = h.coordinator.converse(id, "retry").await.unwrap();
    assert_eq!(reply, "reply after 3 messages");
    assert_eq!(h.store.count_messages(id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let h = Harness::new();

    let err = h.coordinator.converse(404, "hello").await.unwrap_err();
    assert!(matches!(err, RepoChatError::SessionNotFound { id: 404 }));

    let err = h.coordinator.inspect(404).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_history_readable_without_live_handle() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;
    h.coordinator.converse(id, "hi").await.unwrap();

    let after = h.restarted();
    assert_eq!(after.coordinator.state(id).await.unwrap(), SessionState::DurableOnly);

    let history = after.coordinator.inspect(id).await.unwrap();
    assert!(!history.live);
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.repo_url, REPO);

    let listed = after.coordinator.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(!listed[0].live);
    assert_eq!(listed[0].message_count, 2);
}

#[tokio::test]
async fn test_destroy_removes_rows_and_handle() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;
    h.coordinator.converse(id, "hi").await.unwrap();
    assert_eq!(h.coordinator.state(id).await.unwrap(), SessionState::Live);

    h.coordinator.destroy(id).await.unwrap();

    assert_eq!(h.coordinator.state(id).await.unwrap(), SessionState::Absent);
    assert!(!h.coordinator.registry().contains(id));
    assert_eq!(h.store.count_messages(id).await.unwrap(), 0);
    assert_eq!(
        h.coordinator.inspect(id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        h.coordinator.destroy(id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_destroy_durable_only_session() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;

    let after = h.restarted();
    after.coordinator.destroy(id).await.unwrap();
    assert_eq!(after.coordinator.state(id).await.unwrap(), SessionState::Absent);
}

#[tokio::test]
async fn test_missing_credential_creates_nothing() {
    let h = Harness::new();

    let err = h.coordinator.create(REPO, None).await.unwrap_err();
    assert!(matches!(err, RepoChatError::MissingCredential { .. }));
    assert_eq!(err.kind(), ErrorKind::MissingCredential);

    let err = h.coordinator.create(REPO, Some("   ")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingCredential);

    assert_eq!(h.ingestor.calls.load(Ordering::SeqCst), 0);
    assert!(h.coordinator.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_credential_falls_back_to_environment() {
    let env_var = "REPOCHAT_TEST_KEY_FALLBACK";
    std::env::set_var(env_var, "from-env");
    let (store, _join) = spawn_store_server(in_memory_store().unwrap());
    let h = Harness::over(store, env_var);

    h.coordinator.create(REPO, None).await.unwrap();
    h.coordinator.create(REPO, Some("explicit")).await.unwrap();

    let keys = h.connector.keys.lock().unwrap().clone();
    assert_eq!(keys, vec!["from-env".to_string(), "explicit".to_string()]);
    std::env::remove_var(env_var);
}

#[tokio::test]
async fn test_invalid_location_rejected_before_ingest() {
    let h = Harness::new();

    for bad in ["", "   ", "--upload-pack=touch /tmp/x", "not a url", "ftp://example.com/r"] {
        let err = h.coordinator.create(bad, Some("k")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest, "location {bad:?}");
    }
    assert_eq!(h.ingestor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;

    let err = h.coordinator.converse(id, "  ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(h.store.count_messages(id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_shutdown_leaves_sessions_durable_only() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;

    h.coordinator.shutdown();

    assert_eq!(h.coordinator.state(id).await.unwrap(), SessionState::DurableOnly);
    let err = h.coordinator.converse(id, "hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionExpired);
}

#[tokio::test]
async fn test_destroy_waits_for_in_flight_exchange() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;
    h.delay_ms.store(200, Ordering::SeqCst);

    let coordinator = h.coordinator.clone();
    let turn = tokio::spawn(async move { coordinator.converse(id, "q").await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.coordinator.destroy(id).await.unwrap();

    // the turn completed before the delete ran
    assert!(turn.await.unwrap().is_ok());
    assert_eq!(h.coordinator.state(id).await.unwrap(), SessionState::Absent);
    assert_eq!(h.store.count_messages(id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_session_deleted_mid_exchange_is_not_found() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;
    h.delay_ms.store(200, Ordering::SeqCst);

    let coordinator = h.coordinator.clone();
    let turn = tokio::spawn(async move { coordinator.converse(id, "q").await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // another process removes the row while the model is answering
    assert!(h.store.delete_session(id).await.unwrap());

    let err = turn.await.unwrap().unwrap_err();
    assert!(matches!(err, RepoChatError::SessionNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_chat_queued_behind_destroy_is_not_found() {
    let h = Harness::new();
    let id = h.coordinator.create(REPO, Some("k")).await.unwrap().session_id;
    h.delay_ms.store(200, Ordering::SeqCst);

    let first = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.converse(id, "first").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let destroy = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.destroy(id).await })
    };
    let second = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.converse(id, "second").await })
    };

    assert!(first.await.unwrap().is_ok());
    destroy.await.unwrap().unwrap();
    match second.await.unwrap() {
        Ok(_) => panic!("chat on a deleted session must fail"),
        Err(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
    }
}
