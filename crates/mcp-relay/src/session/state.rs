//! Per-connection session state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ClientCapabilities, Implementation, McpError, McpResult, ServerCapabilities};

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Which transport variant a session lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// One peer over a single line-delimited byte stream.
    DuplexStream,
    /// One of many connections on a server that can push events.
    PushStream,
}

impl TransportKind {
    /// Duplex streams may skip the handshake; push connections may not.
    pub fn implicit_handshake(&self) -> bool {
        matches!(self, TransportKind::DuplexStream)
    }

    pub fn can_push(&self) -> bool {
        matches!(self, TransportKind::PushStream)
    }
}

/// Result of capability negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiatedCapabilities {
    pub protocol_version: String,
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub server: ServerCapabilities,
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub state: SessionState,
    pub transport: TransportKind,
    pub protocol_version: Option<String>,
    pub client: Option<Implementation>,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
    pub requests: u64,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    transport: TransportKind,
    capabilities: Option<NegotiatedCapabilities>,
    acknowledged: bool,
    created_at: DateTime<Utc>,
    requests: u64,
}

impl Session {
    pub fn new(id: SessionId, transport: TransportKind) -> Self {
        Self {
            id,
            state: SessionState::Uninitialized,
            transport,
            capabilities: None,
            acknowledged: false,
            created_at: Utc::now(),
            requests: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Uninitialized → Initializing.
    pub fn begin_handshake(&mut self) -> McpResult<()> {
        match self.state {
            SessionState::Uninitialized => {
                self.state = SessionState::Initializing;
                Ok(())
            }
            SessionState::Ready => Err(McpError::AlreadyInitialized),
            SessionState::Initializing => Err(McpError::HandshakeError(
                "handshake already in progress".to_string(),
            )),
            SessionState::Closed => Err(McpError::SessionNotReady {
                method: "initialize".to_string(),
            }),
        }
    }

    /// Initializing → Ready.
    pub fn complete_handshake(&mut self, negotiated: NegotiatedCapabilities) -> McpResult<()> {
        if self.state != SessionState::Initializing {
            return Err(McpError::InternalError(format!(
                "cannot complete handshake from state {:?}",
                self.state
            )));
        }
        tracing::info!(
            session = %self.id,
            version = %negotiated.protocol_version,
            "Session ready"
        );
        self.capabilities = Some(negotiated);
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Negotiation failed: the session is finished.
    pub fn fail_handshake(&mut self) {
        tracing::warn!(session = %self.id, "Handshake failed, closing session");
        self.state = SessionState::Closed;
    }

    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
    }

    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::info!(session = %self.id, "Session closed");
        }
        self.state = SessionState::Closed;
    }

    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            state: self.state,
            transport: self.transport,
            protocol_version: self
                .capabilities
                .as_ref()
                .map(|c| c.protocol_version.clone()),
            client: self.capabilities.as_ref().and_then(|c| c.client_info.clone()),
            acknowledged: self.acknowledged,
            created_at: self.created_at,
            requests: self.requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiated() -> NegotiatedCapabilities {
        NegotiatedCapabilities {
            protocol_version: "2025-06-18".to_string(),
            client: ClientCapabilities::default(),
            client_info: None,
            server: ServerCapabilities::default(),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut session = Session::new(SessionId::generate(), TransportKind::PushStream);
        assert_eq!(session.state(), SessionState::Uninitialized);
        session.begin_handshake().unwrap();
        assert_eq!(session.state(), SessionState::Initializing);
        session.complete_handshake(negotiated()).unwrap();
        assert!(session.is_ready());
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_reinitialize_keeps_ready() {
        let mut session = Session::new(SessionId::generate(), TransportKind::PushStream);
        session.begin_handshake().unwrap();
        session.complete_handshake(negotiated()).unwrap();
        let err = session.begin_handshake().unwrap_err();
        assert!(matches!(err, McpError::AlreadyInitialized));
        assert!(session.is_ready());
    }

    #[test]
    fn test_failed_handshake_closes() {
        let mut session = Session::new(SessionId::generate(), TransportKind::PushStream);
        session.begin_handshake().unwrap();
        session.fail_handshake();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.begin_handshake().is_err());
    }

    #[test]
    fn test_complete_requires_initializing() {
        let mut session = Session::new(SessionId::generate(), TransportKind::DuplexStream);
        assert!(session.complete_handshake(negotiated()).is_err());
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
