//! Per-conversation state, kept in memory for the life of the process.
//!
//! The bot keeps no fields of its own in here yet; each turn only saves its conversation's
//! entry at the end, bumping the etag the way memory-storage conversation state does.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage key: `{channelId}/conversations/{conversationId}`.
pub type StateKey = String;

/// One conversation's state blob.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub etag: String,
    pub turns: u64,
}

/// In-memory store keyed by conversation.
pub struct ConversationStateStore {
    inner: Arc<RwLock<HashMap<StateKey, ConversationState>>>,
}

impl Default for ConversationStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStateStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Storage key for a channel conversation.
    pub fn key(channel_id: &str, conversation_id: &str) -> StateKey {
        format!("{}/conversations/{}", channel_id, conversation_id)
    }

    /// Return a clone of the state if it exists.
    pub async fn get(&self, key: &str) -> Option<ConversationState> {
        self.inner.read().await.get(key).cloned()
    }

    /// Persist the end of a turn: create the entry if needed, bump turn count and etag.
    pub async fn save_changes(&self, key: &str) {
        let mut g = self.inner.write().await;
        let state = g.entry(key.to_string()).or_default();
        state.turns += 1;
        state.etag = uuid::Uuid::new_v4().to_string();
        log::debug!("state: saved {} (turn {})", key, state.turns);
    }

    /// Number of tracked conversations.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
