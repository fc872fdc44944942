//! Session lifecycle: the per-connection state machine and the session table.

pub mod manager;
pub mod state;

pub use manager::{SessionManager, SharedSession};
pub use state::{
    NegotiatedCapabilities, Session, SessionId, SessionInfo, SessionState, TransportKind,
};
