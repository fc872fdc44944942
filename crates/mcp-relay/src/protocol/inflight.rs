//! In-flight request table used to route cancellation notifications.

use std::sync::Arc;

use dashmap::DashMap;

use crate::session::SessionId;
use crate::tools::CancelToken;
use crate::types::RequestId;

type Key = (SessionId, RequestId);

#[derive(Debug, Clone, Default)]
pub struct InFlight {
    requests: Arc<DashMap<Key, CancelToken>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request until the returned guard is dropped.
    pub fn register(&self, session: &SessionId, id: &RequestId) -> InFlightGuard {
        let token = CancelToken::new();
        let key = (session.clone(), id.clone());
        if self.requests.insert(key.clone(), token.clone()).is_some() {
            tracing::warn!(session = %session, id = %id, "Request id reused while still in flight");
        }
        InFlightGuard {
            requests: self.requests.clone(),
            key,
            token,
        }
    }

    /// Signal cancellation. Returns false when nothing matching is in flight.
    pub fn cancel(&self, session: &SessionId, id: &RequestId) -> bool {
        match self.requests.get(&(session.clone(), id.clone())) {
            Some(entry) => {
                entry.value().cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel everything a session still has running.
    pub fn cancel_session(&self, session: &SessionId) -> usize {
        let mut cancelled = 0;
        for entry in self.requests.iter().filter(|e| &e.key().0 == session) {
            entry.value().cancel();
            cancelled += 1;
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Removes its entry on drop (unless the id has since been reused).
pub struct InFlightGuard {
    requests: Arc<DashMap<Key, CancelToken>>,
    key: Key,
    token: CancelToken,
}

impl InFlightGuard {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let token = &self.token;
        self.requests
            .remove_if(&self.key, |_, current| current.same_as(token));
    }
}
