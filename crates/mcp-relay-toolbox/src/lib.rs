//! mcp-relay toolbox: collaborator services behind the built-in relay tools.

pub mod files;
pub mod kv;
pub mod text;
pub mod types;

pub use files::{FileReader, DEFAULT_MAX_BYTES};
pub use kv::KvStore;
pub use text::analyze;
pub use types::*;
