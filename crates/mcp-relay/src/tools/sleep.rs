//! Tool: sleep. Suspend for a while, reporting progress and honouring cancellation.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use super::handler::{handler_fn, CallContext, ToolArgs, ToolFailure, ToolResult};
use super::registry::ToolDescriptor;
use super::schema::{ParamSpec, TypeTag};

/// Longest accepted sleep.
pub const MAX_SECONDS: f64 = 3600.0;

const PROGRESS_STEPS: u32 = 10;

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::builder("sleep", handler_fn(execute))
        .description("Wait for the given number of seconds, then report how long it took")
        .param(ParamSpec::required("seconds", TypeTag::Number).describe("Seconds to wait"))
        .param(ParamSpec::optional("label", TypeTag::String).describe("Echoed in progress messages"))
        .returns(TypeTag::Object)
        .build()
}

async fn execute(args: ToolArgs, ctx: CallContext) -> ToolResult {
    let seconds = args.get("seconds").and_then(Value::as_f64).unwrap_or(0.0);
    if !(0.0..=MAX_SECONDS).contains(&seconds) {
        return Err(ToolFailure::new(format!(
            "seconds must be between 0 and {MAX_SECONDS}"
        ))
        .with_detail(json!({ "seconds": seconds })));
    }
    let label = args.get("label").and_then(Value::as_str).map(str::to_string);

    let step = Duration::from_secs_f64(seconds) / PROGRESS_STEPS;
    let started = Instant::now();

    for done in 1..=PROGRESS_STEPS {
        tokio::select! {
            _ = tokio::time::sleep(step) => {}
            _ = ctx.cancelled() => {
                tracing::debug!(id = %ctx.request_id(), "sleep interrupted");
                return Err(ToolFailure::new("sleep cancelled"));
            }
        }
        if let Err(e) = ctx
            .report_progress(done as f64, Some(PROGRESS_STEPS as f64), label.clone())
            .await
        {
            tracing::debug!("progress not delivered: {e}");
        }
    }

    Ok(json!({
        "slept_ms": started.elapsed().as_millis() as u64,
        "label": label,
    }))
}
