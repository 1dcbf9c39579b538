// src/memory/store_server.rs — Async message passing for Store

use crate::core::types::MessageRole;
use crate::memory::store::{MessageRow, RepositoryRow, SessionRow, SessionSummaryRow, Store};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub enum StoreCommand {
    FindRepository {
        url: String,
        resp: oneshot::Sender<anyhow::Result<Option<RepositoryRow>>>,
    },
    InsertRepository {
        url: String,
        context_text: String,
        file_count: i64,
        resp: oneshot::Sender<anyhow::Result<i64>>,
    },
    InsertSession {
        repository_id: i64,
        resp: oneshot::Sender<anyhow::Result<i64>>,
    },
    GetSession {
        id: i64,
        resp: oneshot::Sender<anyhow::Result<Option<SessionRow>>>,
    },
    ListSessions {
        resp: oneshot::Sender<anyhow::Result<Vec<SessionSummaryRow>>>,
    },
    DeleteSession {
        id: i64,
        resp: oneshot::Sender<anyhow::Result<bool>>,
    },
    InsertMessage {
        session_id: i64,
        role: MessageRole,
        text: String,
        resp: oneshot::Sender<anyhow::Result<i64>>,
    },
    QueryMessages {
        session_id: i64,
        resp: oneshot::Sender<anyhow::Result<Vec<MessageRow>>>,
    },
    CountMessages {
        session_id: i64,
        resp: oneshot::Sender<anyhow::Result<i64>>,
    },
}

/// A handle to the Store that uses message passing.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    pub async fn find_repository(&self, url: &str) -> anyhow::Result<Option<RepositoryRow>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::FindRepository {
                url: url.to_string(),
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    pub async fn insert_repository(
        &self,
        url: String,
        context_text: String,
        file_count: i64,
    ) -> anyhow::Result<i64> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::InsertRepository {
                url,
                context_text,
                file_count,
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    pub async fn insert_session(&self, repository_id: i64) -> anyhow::Result<i64> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::InsertSession {
                repository_id,
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    pub async fn get_session(&self, id: i64) -> anyhow::Result<Option<SessionRow>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::GetSession { id, resp: resp_tx })
            .await?;
        resp_rx.await?
    }

    pub async fn list_sessions(&self) -> anyhow::Result<Vec<SessionSummaryRow>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::ListSessions { resp: resp_tx })
            .await?;
        resp_rx.await?
    }

    pub async fn delete_session(&self, id: i64) -> anyhow::Result<bool> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::DeleteSession { id, resp: resp_tx })
            .await?;
        resp_rx.await?
    }

    pub async fn insert_message(
        &self,
        session_id: i64,
        role: MessageRole,
        text: String,
    ) -> anyhow::Result<i64> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::InsertMessage {
                session_id,
                role,
                text,
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    pub async fn query_messages(&self, session_id: i64) -> anyhow::Result<Vec<MessageRow>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::QueryMessages {
                session_id,
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    pub async fn count_messages(&self, session_id: i64) -> anyhow::Result<i64> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::CountMessages {
                session_id,
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }
}

/// Helper to spawn the store server and return a handle.
pub fn spawn_store_server(store: Store) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::FindRepository { url, resp } => {
                let _ = resp.send(store.find_repository(&url));
            }
            StoreCommand::InsertRepository {
                url,
                context_text,
                file_count,
                resp,
            } => {
                let res = store.insert_repository(&url, &context_text, file_count);
                let _ = resp.send(res);
            }
            StoreCommand::InsertSession {
                repository_id,
                resp,
            } => {
                let _ = resp.send(store.insert_session(repository_id));
            }
            StoreCommand::GetSession { id, resp } => {
                let _ = resp.send(store.get_session(id));
            }
            StoreCommand::ListSessions { resp } => {
                let _ = resp.send(store.list_sessions());
            }
            StoreCommand::DeleteSession { id, resp } => {
                let _ = resp.send(store.delete_session(id));
            }
            StoreCommand::InsertMessage {
                session_id,
                role,
                text,
                resp,
            } => {
                let _ = resp.send(store.insert_message(session_id, role, &text));
            }
            StoreCommand::QueryMessages { session_id, resp } => {
                let _ = resp.send(store.query_messages(session_id));
            }
            StoreCommand::CountMessages { session_id, resp } => {
                let _ = resp.send(store.count_messages(session_id));
            }
        }
    }
    tracing::debug!("Store server stopped");
}
