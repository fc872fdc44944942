//! Tool: text_stats. Count words, lines and characters.

use serde_json::Value;

use super::handler::{sync_fn, ToolArgs, ToolFailure, ToolResult};
use super::registry::ToolDescriptor;
use super::schema::{ParamSpec, TypeTag};

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::builder("text_stats", sync_fn(execute))
        .description("Count the words, lines, characters and bytes in a text")
        .param(ParamSpec::required("text", TypeTag::String))
        .returns(TypeTag::Object)
        .build()
}

fn execute(args: ToolArgs) -> ToolResult {
    let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
    let stats = mcp_relay_toolbox::analyze(text);
    serde_json::to_value(stats).map_err(|e| ToolFailure::new(e.to_string()))
}
