//! Tool: split_lines. Stream each line of a text as a partial result.

use serde_json::{json, Value};

use super::handler::{handler_fn, CallContext, ToolArgs, ToolFailure, ToolResult};
use super::registry::ToolDescriptor;
use super::schema::{ParamSpec, TypeTag};

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::builder("split_lines", handler_fn(execute))
        .description("Split a text into lines, streaming each one before the final count")
        .param(ParamSpec::required("text", TypeTag::String))
        .param(
            ParamSpec::optional("skip_blank", TypeTag::Boolean)
                .describe("Leave out lines that are empty or whitespace")
                .with_default(json!(false)),
        )
        .returns(TypeTag::Object)
        .build()
}

async fn execute(args: ToolArgs, ctx: CallContext) -> ToolResult {
    let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
    let skip_blank = args.get("skip_blank").and_then(Value::as_bool).unwrap_or(false);

    let mut count = 0usize;
    for line in text.lines() {
        if skip_blank && line.trim().is_empty() {
            continue;
        }
        if ctx.is_cancelled() {
            return Err(ToolFailure::new("split cancelled"));
        }
        ctx.emit_partial(json!({ "index": count, "line": line }))
            .await
            .map_err(|e| ToolFailure::new(format!("partial not delivered: {e}")))?;
        count += 1;
    }

    Ok(json!({ "lines": count, "streamed": ctx.can_stream() }))
}
