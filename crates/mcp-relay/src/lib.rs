//! MCP relay: JSON-RPC 2.0 tool dispatch over stdio or a push-capable SSE stream.

pub mod config;
pub mod protocol;
pub mod repl;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{ConfigOverrides, RelayConfig};
pub use protocol::{DispatchOptions, Dispatcher};
pub use session::SessionManager;
pub use tools::{register_builtin, ToolRegistry, Toolbox};
pub use transport::StdioTransport;

use std::sync::Arc;

use mcp_relay_toolbox::{FileReader, KvStore};

/// Build a dispatcher serving the built-in tools as configured.
pub fn build_dispatcher(config: &RelayConfig) -> types::McpResult<Arc<Dispatcher>> {
    let kv = match &config.kv_file {
        Some(path) => KvStore::open(path)?,
        None => KvStore::new(),
    };
    let files = FileReader::new(&config.root)?;
    let toolbox = Toolbox::new(kv, files);

    let mut registry = ToolRegistry::new();
    register_builtin(&mut registry, &toolbox)?;
    tracing::debug!("Registered {} tools", registry.len());

    Ok(Arc::new(Dispatcher::new(
        Arc::new(registry),
        Arc::new(SessionManager::new()),
        config.dispatch_options(),
    )))
}
