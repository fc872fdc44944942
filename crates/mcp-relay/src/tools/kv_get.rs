//! Tool: kv_get. Read a value from the shared key/value store.

use std::sync::Arc;

use mcp_relay_toolbox::KvStore;
use serde_json::Value;

use super::handler::sync_fn;
use super::registry::ToolDescriptor;
use super::schema::{ParamSpec, TypeTag};

pub fn descriptor(kv: Arc<KvStore>) -> ToolDescriptor {
    let handler = sync_fn(move |args| {
        let key = args.get("key").and_then(Value::as_str).unwrap_or_default();
        Ok(kv.get(key).unwrap_or(Value::Null))
    });

    ToolDescriptor::builder("kv_get", handler)
        .description("Read a value by key; null when the key is unset")
        .param(ParamSpec::required("key", TypeTag::String))
        .returns(TypeTag::Any)
        .build()
}
