//! MCP protocol handling: codec, negotiation, and JSON-RPC dispatch.

pub mod codec;
pub mod dispatcher;
pub mod inflight;
pub mod negotiation;
pub mod validator;

pub use dispatcher::{DispatchOptions, Dispatcher, DEFAULT_HANDLER_TIMEOUT};
