//! Session table keyed by connection.
//!
//! The table itself is sharded; each session has its own lock, so handshakes
//! and teardown on one connection never wait on another.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;

use crate::types::{McpError, McpResult};

use super::state::{Session, SessionId, SessionInfo, TransportKind};

pub type SharedSession = Arc<Mutex<Session>>;

/// Owns every live session.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<SessionId, SharedSession>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a new connection.
    pub fn open(&self, transport: TransportKind) -> SessionId {
        let id = SessionId::generate();
        let session = Session::new(id.clone(), transport);
        self.sessions
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        tracing::info!(session = %id, ?transport, "Session opened");
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Run `f` with the session locked. Never hold the result across an await.
    pub fn with_session<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut Session) -> R,
    ) -> McpResult<R> {
        let shared = self
            .get(id)
            .ok_or_else(|| McpError::SessionNotFound(id.to_string()))?;
        let mut session = lock(&shared);
        Ok(f(&mut session))
    }

    pub fn info(&self, id: &SessionId) -> Option<SessionInfo> {
        self.get(id).map(|s| lock(&s).info())
    }

    /// Tear down a connection's session.
    pub fn close(&self, id: &SessionId) -> Option<SessionInfo> {
        let (_, shared) = self.sessions.remove(id)?;
        let mut session = lock(&shared);
        session.close();
        Some(session.info())
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

/// Lock a session, recovering from a poisoned lock.
pub fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}
