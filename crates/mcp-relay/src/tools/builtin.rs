//! The tools the `mcp-relay` binary serves out of the box.

use std::sync::Arc;

use mcp_relay_toolbox::{FileReader, KvStore};

use crate::types::McpResult;

use super::registry::ToolRegistry;
use super::{echo, kv_get, kv_set, read_file, sleep, split_lines, text_stats};

/// Collaborators shared by the built-in tools.
#[derive(Debug, Clone)]
pub struct Toolbox {
    pub kv: Arc<KvStore>,
    pub files: Arc<FileReader>,
}

impl Toolbox {
    pub fn new(kv: KvStore, files: FileReader) -> Self {
        Self {
            kv: Arc::new(kv),
            files: Arc::new(files),
        }
    }
}

/// Register every built-in tool, in listing order.
pub fn register_builtin(registry: &mut ToolRegistry, toolbox: &Toolbox) -> McpResult<()> {
    registry.register(echo::descriptor())?;
    registry.register(sleep::descriptor())?;
    registry.register(text_stats::descriptor())?;
    registry.register(kv_get::descriptor(toolbox.kv.clone()))?;
    registry.register(kv_set::descriptor(toolbox.kv.clone()))?;
    registry.register(read_file::descriptor(toolbox.files.clone()))?;
    registry.register(split_lines::descriptor())?;
    Ok(())
}
