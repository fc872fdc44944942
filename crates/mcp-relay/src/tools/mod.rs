//! Tool contract, registry, schema validation and the built-in tools.

pub mod builtin;
pub mod echo;
pub mod handler;
pub mod kv_get;
pub mod kv_set;
pub mod read_file;
pub mod registry;
pub mod schema;
pub mod sleep;
pub mod split_lines;
pub mod text_stats;

pub use builtin::{register_builtin, Toolbox};
pub use handler::{
    handler_fn, sync_fn, CallContext, CancelToken, ToolArgs, ToolFailure, ToolHandler, ToolResult,
};
pub use registry::{ToolDescriptor, ToolDescriptorBuilder, ToolRegistry};
pub use schema::{ParamSpec, TypeTag};
