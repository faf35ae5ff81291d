//! In-memory session store
//!
//! Uses DashMap for thread-safe concurrent access. Suitable for tests and
//! single-instance development setups; sessions are lost on restart.

use crate::error::SessionResult;
use crate::traits::{Session, SessionStore};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

/// In-memory session store
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        debug!("Creating new in-memory session store");
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Number of stored sessions, expired ones included
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>> {
        let session = self.sessions.get(session_id).map(|s| s.clone());

        match session {
            Some(session) if session.is_expired() => {
                trace!(session_id = %session_id, "Dropping expired session");
                self.sessions.remove(session_id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        trace!(session_id = %session.id, "Saving session");
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired());
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            debug!(removed, remaining = self.sessions.len(), "Removed expired sessions");
        }
        Ok(removed)
    }
}
