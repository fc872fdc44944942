//! Tool: read_file. Read a file under the sandbox root.

use std::sync::Arc;

use mcp_relay_toolbox::FileReader;
use serde_json::Value;

use super::handler::{sync_fn, ToolArgs, ToolFailure, ToolResult};
use super::registry::ToolDescriptor;
use super::schema::{ParamSpec, TypeTag};

pub fn descriptor(files: Arc<FileReader>) -> ToolDescriptor {
    ToolDescriptor::builder("read_file", sync_fn(move |args| execute(&files, args)))
        .description("Read a file relative to the server root; binary content comes back base64-encoded")
        .param(ParamSpec::required("path", TypeTag::String).describe("Path relative to the root"))
        .param(
            ParamSpec::optional("max_bytes", TypeTag::Integer)
                .describe("Refuse files larger than this"),
        )
        .returns(TypeTag::Object)
        .build()
}

fn execute(files: &FileReader, args: ToolArgs) -> ToolResult {
    let path = args.get("path").and_then(Value::as_str).unwrap_or_default();
    let limit = match args.get("max_bytes").and_then(Value::as_i64) {
        Some(n) if n < 0 => {
            return Err(ToolFailure::new("max_bytes must not be negative"));
        }
        Some(n) => Some(n as u64),
        None => None,
    };

    let content = files.read(path, limit)?;
    serde_json::to_value(content).map_err(|e| ToolFailure::new(e.to_string()))
}
