//! Tool: echo. Return the given text unchanged.

use serde_json::Value;

use super::handler::{sync_fn, ToolArgs, ToolResult};
use super::registry::ToolDescriptor;
use super::schema::{ParamSpec, TypeTag};

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::builder("echo", sync_fn(execute))
        .description("Return the given text unchanged")
        .param(ParamSpec::required("text", TypeTag::String).describe("Text to echo back"))
        .returns(TypeTag::String)
        .build()
}

fn execute(args: ToolArgs) -> ToolResult {
    Ok(args.get("text").cloned().unwrap_or(Value::Null))
}
