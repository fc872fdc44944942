//! Tool: kv_set. Store a value in the shared key/value store.

use std::sync::Arc;

use mcp_relay_toolbox::KvStore;
use serde_json::{json, Value};

use super::handler::{sync_fn, ToolArgs, ToolResult};
use super::registry::ToolDescriptor;
use super::schema::{ParamSpec, TypeTag};

pub fn descriptor(kv: Arc<KvStore>) -> ToolDescriptor {
    ToolDescriptor::builder("kv_set", sync_fn(move |args| execute(&kv, args)))
        .description("Store any JSON value under a key, persisting it when a snapshot file is configured")
        .param(ParamSpec::required("key", TypeTag::String))
        .param(ParamSpec::required("value", TypeTag::Any))
        .returns(TypeTag::Object)
        .build()
}

fn execute(kv: &KvStore, args: ToolArgs) -> ToolResult {
    let key = args.get("key").and_then(Value::as_str).unwrap_or_default();
    let value = args.get("value").cloned().unwrap_or(Value::Null);

    let previous = kv.set(key, value)?;
    let persisted = kv.snapshot_path().is_some();
    if persisted {
        kv.save()?;
    }

    Ok(json!({
        "key": key,
        "previous": previous,
        "persisted": persisted,
    }))
}
