// src/core/registry.rs — In-memory map of live conversations

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Mutex as AsyncMutex;

use crate::conversation::Conversation;

/// Shared, lockable live handle. The async mutex serializes turns within one
/// session; the registry's own lock is never held across an await.
pub type LiveConversation = Arc<AsyncMutex<Conversation>>;

/// Registry of live conversations keyed by session id.
///
/// Created once at startup and handed to request handlers; its contents die
/// with the process.
#[derive(Default)]
pub struct SessionRegistry {
    live: Mutex<HashMap<i64, LiveConversation>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<i64, LiveConversation>> {
        // A poisoned lock only means another request panicked mid-insert;
        // the map itself is still usable.
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, session_id: i64, conversation: Conversation) -> LiveConversation {
        let handle = Arc::new(AsyncMutex::new(conversation));
        self.map().insert(session_id, handle.clone());
        handle
    }

    pub fn get(&self, session_id: i64) -> Option<LiveConversation> {
        self.map().get(&session_id).cloned()
    }

    pub fn contains(&self, session_id: i64) -> bool {
        self.map().contains_key(&session_id)
    }

    /// Drop a live handle. Returns whether one was registered.
    pub fn remove(&self, session_id: i64) -> bool {
        self.map().remove(&session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Drop every live handle (process shutdown).
    pub fn clear(&self) -> usize {
        let mut map = self.map();
        let n = map.len();
        map.clear();
        n
    }
}
