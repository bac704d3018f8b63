//! Session persistence layer
//!
//! The orchestrator never stores anything itself; callers load the session and
//! history before a turn and save what the turn returns.
//! Currently in-memory; a database-backed store implements the same trait.

use crate::memory::{ChatMessage, ConversationHistory};
use crate::models::SessionState;
use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for session persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored session, or a fresh one for an unknown user
    async fn load_session(&self, user_id: Uuid) -> Result<SessionState>;
    async fn save_session(&self, session: &SessionState) -> Result<()>;
    async fn load_history(&self, user_id: Uuid) -> Result<Vec<ChatMessage>>;
    async fn append_message(&self, user_id: Uuid, message: ChatMessage) -> Result<()>;
    async fn forget(&self, user_id: Uuid) -> Result<()>;
}

/// In-memory session store for development
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionState>>>,
    histories: Arc<RwLock<HashMap<Uuid, ConversationHistory>>>,
    history_capacity: usize,
}

impl InMemorySessionStore {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            histories: Arc::new(RwLock::new(HashMap::new())),
            history_capacity,
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_session(&self, user_id: Uuid) -> Result<SessionState> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| SessionState::new(user_id)))
    }

    async fn save_session(&self, session: &SessionState) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id, session.clone());
        Ok(())
    }

    async fn load_history(&self, user_id: Uuid) -> Result<Vec<ChatMessage>> {
        let histories = self.histories.read().await;
        Ok(histories
            .get(&user_id)
            .map(ConversationHistory::to_vec)
            .unwrap_or_default())
    }

    async fn append_message(&self, user_id: Uuid, message: ChatMessage) -> Result<()> {
        let mut histories = self.histories.write().await;
        histories
            .entry(user_id)
            .or_insert_with(|| ConversationHistory::new(self.history_capacity))
            .push(message);
        Ok(())
    }

    async fn forget(&self, user_id: Uuid) -> Result<()> {
        self.sessions.write().await.remove(&user_id);
        self.histories.write().await.remove(&user_id);
        Ok(())
    }
}

/// Same external identifier, same user id.
pub fn stable_user_id(external_id: &str) -> Uuid {
    let hash = Sha256::digest(external_id.trim().as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Parse a UUID, or derive a stable one from any other identifier.
pub fn user_id_for(external_id: &str) -> Uuid {
    Uuid::parse_str(external_id.trim()).unwrap_or_else(|_| stable_user_id(external_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_user_gets_fresh_session() {
        let store = InMemorySessionStore::default();
        let user_id = Uuid::new_v4();

        let session = store.load_session(user_id).await.unwrap();
        assert_eq!(session, SessionState::new(user_id));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemorySessionStore::default();
        let mut session = SessionState::new(Uuid::new_v4());
        session.greeted = true;
        session.iteration = 2;

        store.save_session(&session).await.unwrap();
        assert_eq!(store.load_session(session.user_id).await.unwrap(), session);

        store.forget(session.user_id).await.unwrap();
        assert!(!store.load_session(session.user_id).await.unwrap().greeted);
    }

    #[tokio::test]
    async fn test_history_is_bounded_per_user() {
        let store = InMemorySessionStore::new(2);
        let user_id = Uuid::new_v4();

        for text in ["uno", "dos", "tres"] {
            store.append_message(user_id, ChatMessage::user(text)).await.unwrap();
        }

        let history = store.load_history(user_id).await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["dos", "tres"]);
        assert!(store.load_history(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[test]
    fn test_stable_user_id() {
        assert_eq!(stable_user_id("alumna@uc.cl"), stable_user_id("alumna@uc.cl"));
        assert_ne!(stable_user_id("alumna@uc.cl"), stable_user_id("otra@uc.cl"));
        assert_eq!(stable_user_id("x").get_version_num(), 4);

        let id = Uuid::new_v4();
        assert_eq!(user_id_for(&id.to_string()), id);
    }
}
