//! Message codec: bytes to envelopes and back.
//!
//! Decoding is strict about envelope structure and silent about tool
//! semantics; method resolution and argument checks happen in the dispatcher.

use serde_json::Value;

use crate::types::{
    error_codes, Inbound, JsonRpcError, JsonRpcErrorObject, JsonRpcNotification, JsonRpcReply,
    JsonRpcRequest, JsonRpcResponse, McpError, McpResult, RequestId, JSONRPC_VERSION,
};

use super::validator::{recover_id, validate_id, validate_method, validate_params, validate_version};

/// A decode failure, with the request id when it could still be read.
#[derive(Debug)]
pub struct Malformed {
    pub id: Option<RequestId>,
    pub error: McpError,
}

impl Malformed {
    fn new(id: Option<RequestId>, error: McpError) -> Self {
        Self { id, error }
    }

    /// Error reply for the sender, when its id is known.
    pub fn to_reply(&self) -> Option<JsonRpcReply> {
        self.id
            .clone()
            .map(|id| JsonRpcReply::Error(self.error.to_json_rpc_error(id)))
    }
}

impl std::fmt::Display for Malformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} (id {id})", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Decode one inbound frame into a request or notification.
pub fn decode(raw: &[u8]) -> Result<Inbound, Malformed> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| Malformed::new(None, McpError::ParseError(e.to_string())))?;

    let Value::Object(envelope) = value else {
        return Err(Malformed::new(
            None,
            McpError::InvalidRequest("Message must be a JSON object".to_string()),
        ));
    };

    let fail = |error: McpError| Malformed::new(recover_id(&envelope), error);

    validate_version(&envelope).map_err(fail)?;
    let method = validate_method(&envelope).map_err(fail)?;
    let id = validate_id(&envelope).map_err(fail)?;
    let params = validate_params(&envelope).map_err(fail)?;

    Ok(match id {
        Some(id) => Inbound::Request(JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method,
            params,
        }),
        None => Inbound::Notification(JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params,
        }),
    })
}

/// Decode a reply frame (the client side of the codec).
pub fn decode_reply(raw: &[u8]) -> McpResult<JsonRpcReply> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| McpError::ParseError(e.to_string()))?;

    let Value::Object(envelope) = &value else {
        return Err(McpError::InvalidRequest(
            "Reply must be a JSON object".to_string(),
        ));
    };
    validate_version(envelope)?;

    match (envelope.contains_key("result"), envelope.contains_key("error")) {
        (true, false) => serde_json::from_value::<JsonRpcResponse>(value)
            .map(JsonRpcReply::Success)
            .map_err(|e| McpError::InvalidRequest(e.to_string())),
        (false, true) => serde_json::from_value::<JsonRpcError>(value)
            .map(JsonRpcReply::Error)
            .map_err(|e| McpError::InvalidRequest(e.to_string())),
        (true, true) => Err(McpError::InvalidRequest(
            "Reply carries both result and error".to_string(),
        )),
        (false, false) => Err(McpError::InvalidRequest(
            "Reply carries neither result nor error".to_string(),
        )),
    }
}

/// Encode a reply. Never fails: if serialization breaks, an internal-error
/// reply with the same id is produced instead.
pub fn encode(reply: &JsonRpcReply) -> String {
    serde_json::to_string(reply).unwrap_or_else(|e| {
        tracing::error!("Failed to encode reply: {e}");
        let fallback = JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: reply.id().clone(),
            error: JsonRpcErrorObject {
                code: error_codes::INTERNAL_ERROR,
                message: "Internal error: reply could not be encoded".to_string(),
                data: None,
            },
        };
        serde_json::to_string(&fallback).unwrap_or_default()
    })
}

/// Encode a server-initiated notification.
pub fn encode_notification(notification: &JsonRpcNotification) -> String {
    serde_json::to_string(notification).unwrap_or_else(|e| {
        tracing::error!("Failed to encode notification: {e}");
        String::new()
    })
}
