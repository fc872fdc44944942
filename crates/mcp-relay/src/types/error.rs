//! Error types and JSON-RPC error codes for the relay.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP/relay-specific error codes.
pub mod mcp_error_codes {
    pub const SESSION_NOT_READY: i32 = -32002;
    pub const HANDSHAKE_FAILED: i32 = -32003;
    pub const HANDLER_FAILURE: i32 = -32010;
    pub const HANDLER_TIMEOUT: i32 = -32011;
    pub const SESSION_NOT_FOUND: i32 = -32851;

    /// Server: Unauthorized (missing or invalid bearer token).
    pub const UNAUTHORIZED: i32 = -32900;
}

/// Why a single argument failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    TypeMismatch,
    Unrecognized,
}

/// One offending parameter in an `InvalidArguments` error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentViolation {
    pub param: String,
    pub problem: ViolationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
}

impl std::fmt::Display for ArgumentViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.problem {
            ViolationKind::Missing => write!(f, "{} (missing)", self.param),
            ViolationKind::Unrecognized => write!(f, "{} (unrecognized)", self.param),
            ViolationKind::TypeMismatch => write!(
                f,
                "{} (expected {}, found {})",
                self.param,
                self.expected.as_deref().unwrap_or("?"),
                self.found.as_deref().unwrap_or("?")
            ),
        }
    }
}

fn join_violations(violations: &[ArgumentViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// All errors that can occur in the relay.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("Invalid tool descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments for tool '{tool}': {}", join_violations(.violations))]
    InvalidArguments {
        tool: String,
        violations: Vec<ArgumentViolation>,
    },

    #[error("Session not ready: {method} requires a completed handshake")]
    SessionNotReady { method: String },

    #[error("Session already initialized")]
    AlreadyInitialized,

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Tool '{tool}' failed: {message}")]
    HandlerFailure {
        tool: String,
        message: String,
        detail: Option<serde_json::Value>,
    },

    #[error("Tool '{tool}' timed out after {timeout_ms}ms")]
    HandlerTimeout { tool: String, timeout_ms: u64 },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unauthorized: missing or invalid bearer token.
    #[error("Unauthorized")]
    Unauthorized,
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) | McpError::AlreadyInitialized => INVALID_REQUEST,
            McpError::ToolNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidArguments { .. } => INVALID_PARAMS,
            McpError::SessionNotReady { .. } => SESSION_NOT_READY,
            McpError::HandshakeError(_) => HANDSHAKE_FAILED,
            McpError::HandlerFailure { .. } => HANDLER_FAILURE,
            McpError::HandlerTimeout { .. } => HANDLER_TIMEOUT,
            McpError::SessionNotFound(_) => SESSION_NOT_FOUND,
            McpError::Unauthorized => UNAUTHORIZED,
            McpError::DuplicateTool(_)
            | McpError::InvalidDescriptor(_)
            | McpError::ConnectionClosed
            | McpError::Transport(_)
            | McpError::Config(_)
            | McpError::InternalError(_)
            | McpError::Io(_)
            | McpError::Json(_) => INTERNAL_ERROR,
        }
    }

    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::ParseError(_) | McpError::InvalidRequest(_) => "MalformedMessage",
            McpError::DuplicateTool(_) => "DuplicateTool",
            McpError::InvalidDescriptor(_) => "InvalidDescriptor",
            McpError::ToolNotFound(_) => "ToolNotFound",
            McpError::InvalidArguments { .. } => "InvalidArguments",
            McpError::SessionNotReady { .. } => "SessionNotReady",
            McpError::AlreadyInitialized => "AlreadyInitialized",
            McpError::HandshakeError(_) => "HandshakeError",
            McpError::HandlerFailure { .. } => "HandlerFailure",
            McpError::HandlerTimeout { .. } => "HandlerTimeout",
            McpError::SessionNotFound(_) => "SessionNotFound",
            McpError::ConnectionClosed => "ConnectionClosed",
            McpError::Transport(_) | McpError::Io(_) => "TransportError",
            McpError::Unauthorized => "Unauthorized",
            McpError::Config(_) | McpError::InternalError(_) | McpError::Json(_) => {
                "InternalError"
            }
        }
    }

    /// Transport-level failures end the connection and are never put on the wire.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            McpError::ConnectionClosed | McpError::Transport(_) | McpError::Io(_)
        )
    }

    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        let mut data = json!({ "kind": self.kind() });
        match self {
            McpError::InvalidArguments { tool, violations } => {
                data["tool"] = json!(tool);
                data["violations"] = json!(violations);
            }
            McpError::HandlerFailure {
                tool,
                message,
                detail,
            } => {
                data["tool"] = json!(tool);
                data["detail"] = detail.clone().unwrap_or_else(|| json!(message));
            }
            McpError::HandlerTimeout { tool, timeout_ms } => {
                data["tool"] = json!(tool);
                data["timeoutMs"] = json!(timeout_ms);
            }
            McpError::ToolNotFound(name) => {
                data["tool"] = json!(name);
            }
            McpError::SessionNotReady { method } => {
                data["method"] = json!(method);
            }
            _ => {}
        }

        JsonRpcErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: Some(data),
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: self.to_error_object(),
        }
    }
}

impl From<mcp_relay_toolbox::ToolboxError> for McpError {
    fn from(e: mcp_relay_toolbox::ToolboxError) -> Self {
        McpError::InternalError(e.to_string())
    }
}

pub type McpResult<T> = Result<T, McpError>;
