//! MCP capability negotiation during initialization.

use serde_json::Value;

use crate::session::NegotiatedCapabilities;
use crate::types::{
    ClientCapabilities, InitializeParams, InitializeResult, McpError, McpResult,
    ServerCapabilities, MCP_VERSION, SUPPORTED_VERSIONS,
};

/// Negotiate from the client's `initialize` params.
///
/// Unsupported versions and unreadable params are handshake failures.
pub fn negotiate(
    params: Option<Value>,
    streaming: bool,
) -> McpResult<(NegotiatedCapabilities, InitializeResult)> {
    let params: InitializeParams = params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::HandshakeError(format!("Invalid initialize params: {e}")))?
        .ok_or_else(|| McpError::HandshakeError("Initialize params required".to_string()))?;

    if !SUPPORTED_VERSIONS.contains(&params.protocol_version.as_str()) {
        return Err(McpError::HandshakeError(format!(
            "Unsupported protocol version {}; supported: {}",
            params.protocol_version,
            SUPPORTED_VERSIONS.join(", ")
        )));
    }

    tracing::info!(
        "Initialized with client: {} v{} (protocol {})",
        params.client_info.name,
        params.client_info.version,
        params.protocol_version
    );

    let server = ServerCapabilities::advertised(streaming);
    let result = InitializeResult::for_version(&params.protocol_version, server.clone());
    let negotiated = NegotiatedCapabilities {
        protocol_version: params.protocol_version,
        client: params.capabilities,
        client_info: Some(params.client_info),
        server,
    };

    Ok((negotiated, result))
}

/// Defaults used when a duplex peer skips the handshake.
pub fn implicit(streaming: bool) -> NegotiatedCapabilities {
    NegotiatedCapabilities {
        protocol_version: MCP_VERSION.to_string(),
        client: ClientCapabilities::default(),
        client_info: None,
        server: ServerCapabilities::advertised(streaming),
    }
}
