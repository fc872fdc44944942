//! JSON-RPC envelope validation.

use serde_json::{Map, Value};

use crate::types::{McpError, McpResult, RequestId, JSONRPC_VERSION};

/// Check the `jsonrpc` tag.
pub fn validate_version(envelope: &Map<String, Value>) -> McpResult<()> {
    match envelope.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => Ok(()),
        Some(other) => Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got {other}"
        ))),
        None => Err(McpError::InvalidRequest(
            "Missing \"jsonrpc\" field".to_string(),
        )),
    }
}

/// Extract a non-empty method name.
pub fn validate_method(envelope: &Map<String, Value>) -> McpResult<String> {
    match envelope.get("method") {
        Some(Value::String(m)) if !m.is_empty() => Ok(m.clone()),
        Some(Value::String(_)) => Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        )),
        Some(_) => Err(McpError::InvalidRequest(
            "Method must be a string".to_string(),
        )),
        None => Err(McpError::InvalidRequest("Missing \"method\" field".to_string())),
    }
}

/// Parse the correlation id of a request. Requests must carry a string or
/// integer id; `None` means the field is absent (a notification).
pub fn validate_id(envelope: &Map<String, Value>) -> McpResult<Option<RequestId>> {
    match envelope.get("id") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(RequestId::String(s.clone()))),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|n| Some(RequestId::Number(n)))
            .ok_or_else(|| McpError::InvalidRequest(format!("Request id must be an integer, got {n}"))),
        Some(Value::Null) => Err(McpError::InvalidRequest(
            "Request id must not be null".to_string(),
        )),
        Some(other) => Err(McpError::InvalidRequest(format!(
            "Request id must be a string or integer, got {other}"
        ))),
    }
}

/// Params, when present, must be a mapping.
pub fn validate_params(envelope: &Map<String, Value>) -> McpResult<Option<Value>> {
    match envelope.get("params") {
        None | Some(Value::Null) => Ok(None),
        Some(params @ Value::Object(_)) => Ok(Some(params.clone())),
        Some(_) => Err(McpError::InvalidRequest(
            "Params must be an object of named parameters".to_string(),
        )),
    }
}

/// Best-effort id recovery from a message that failed validation.
pub fn recover_id(envelope: &Map<String, Value>) -> Option<RequestId> {
    validate_id(envelope).ok().flatten()
}
