//! Tool registration and lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::types::{McpError, McpResult, ToolDefinition};

use super::handler::ToolHandler;
use super::schema::{input_schema, validate_arguments, ParamSpec, TypeTag};

/// Method names owned by the protocol; tools may not shadow them.
const RESERVED_METHODS: &[&str] = &["initialize", "ping", "shutdown", "tools/list", "tools/call"];

/// A registered tool: schema, documentation, and handler. Immutable once built.
pub struct ToolDescriptor {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    returns: TypeTag,
    variadic: bool,
    timeout: Option<Duration>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn builder(name: &str, handler: Arc<dyn ToolHandler>) -> ToolDescriptorBuilder {
        ToolDescriptorBuilder {
            descriptor: ToolDescriptor {
                name: name.to_string(),
                description: String::new(),
                params: Vec::new(),
                returns: TypeTag::Any,
                variadic: false,
                timeout: None,
                handler,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn returns(&self) -> TypeTag {
        self.returns
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Per-tool timeout override.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        self.handler.clone()
    }

    /// Check `args` against the declared schema; see [`validate_arguments`].
    pub fn validate(&self, args: Map<String, Value>) -> McpResult<Map<String, Value>> {
        validate_arguments(&self.params, self.variadic, args).map_err(|violations| {
            McpError::InvalidArguments {
                tool: self.name.clone(),
                violations,
            }
        })
    }

    /// The summary advertised by `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            input_schema: input_schema(&self.params, self.variadic),
            output_schema: match self.returns {
                TypeTag::Any => None,
                // outputSchema must describe an object; wrap scalar returns.
                TypeTag::Object => Some(self.returns.json_schema()),
                other => Some(json!({
                    "type": "object",
                    "properties": { "result": other.json_schema() }
                })),
            },
        }
    }

    fn check(&self) -> McpResult<()> {
        if self.name.trim().is_empty() {
            return Err(McpError::InvalidDescriptor(
                "tool name must not be empty".to_string(),
            ));
        }
        if RESERVED_METHODS.contains(&self.name.as_str()) || self.name.starts_with("notifications/")
        {
            return Err(McpError::InvalidDescriptor(format!(
                "'{}' is a protocol method and cannot be used as a tool name",
                self.name
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(McpError::InvalidDescriptor(format!(
                    "tool '{}' declares parameter '{}' twice",
                    self.name, param.name
                )));
            }
            if let Some(default) = &param.default {
                if !param.type_tag.matches(default) {
                    return Err(McpError::InvalidDescriptor(format!(
                        "tool '{}': default for '{}' is not a {}",
                        self.name, param.name, param.type_tag
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("variadic", &self.variadic)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

pub struct ToolDescriptorBuilder {
    descriptor: ToolDescriptor,
}

impl ToolDescriptorBuilder {
    pub fn description(mut self, description: &str) -> Self {
        self.descriptor.description = description.to_string();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.descriptor.params.push(param);
        self
    }

    pub fn returns(mut self, returns: TypeTag) -> Self {
        self.descriptor.returns = returns;
        self
    }

    /// Accept argument names beyond the declared parameters.
    pub fn variadic(mut self) -> Self {
        self.descriptor.variadic = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ToolDescriptor {
        self.descriptor
    }
}

/// Name-unique set of tools in registration order.
///
/// Populated at startup, then shared read-only (typically behind an `Arc`).
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> McpResult<Arc<ToolDescriptor>> {
        descriptor.check()?;
        if self.index.contains_key(descriptor.name()) {
            return Err(McpError::DuplicateTool(descriptor.name().to_string()));
        }

        let descriptor = Arc::new(descriptor);
        self.index
            .insert(descriptor.name().to_string(), self.tools.len());
        self.tools.push(descriptor.clone());
        tracing::debug!("Registered tool '{}'", descriptor.name());
        Ok(descriptor)
    }

    pub fn lookup(&self, name: &str) -> McpResult<Arc<ToolDescriptor>> {
        self.index
            .get(name)
            .map(|&i| self.tools[i].clone())
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))
    }

    /// Descriptors in registration order. The iterator is `Clone`, so it can
    /// be restarted from any point.
    pub fn list(&self) -> std::slice::Iter<'_, Arc<ToolDescriptor>> {
        self.tools.iter()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.list().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::handler::sync_fn;

    fn noop() -> Arc<dyn ToolHandler> {
        sync_fn(|_| Ok(Value::Null))
    }

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::builder(name, noop())
            .description("test tool")
            .param(ParamSpec::required("text", TypeTag::String))
            .build()
    }

    #[test]
    fn test_lookup_returns_registered_descriptor() {
        let mut registry = ToolRegistry::new();
        let registered = registry.register(tool("echo")).unwrap();
        let found = registry.lookup("echo").unwrap();
        assert!(Arc::ptr_eq(&registered, &found));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("echo")).unwrap();
        let err = registry.register(tool("echo")).unwrap_err();
        assert!(matches!(err, McpError::DuplicateTool(ref n) if n == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_missing() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.lookup("vanish").unwrap_err().kind(), "ToolNotFound");
    }

    #[test]
    fn test_list_is_ordered_and_restartable() {
        let mut registry = ToolRegistry::new();
        for name in ["b", "a", "c"] {
            registry.register(tool(name)).unwrap();
        }
        let iter = registry.list();
        let first: Vec<&str> = iter.clone().map(|t| t.name()).collect();
        let second: Vec<&str> = iter.map(|t| t.name()).collect();
        assert_eq!(first, vec!["b", "a", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reserved_and_empty_names_rejected() {
        let mut registry = ToolRegistry::new();
        for name in ["", "initialize", "tools/list", "notifications/cancelled"] {
            let err = registry.register(tool(name)).unwrap_err();
            assert_eq!(err.kind(), "InvalidDescriptor", "name {name:?}");
        }
    }

    #[test]
    fn test_bad_default_rejected() {
        let mut registry = ToolRegistry::new();
        let descriptor = ToolDescriptor::builder("t", noop())
            .param(ParamSpec::optional("n", TypeTag::Integer).with_default(json!("ten")))
            .build();
        assert!(registry.register(descriptor).is_err());
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let mut registry = ToolRegistry::new();
        let descriptor = ToolDescriptor::builder("t", noop())
            .param(ParamSpec::required("x", TypeTag::String))
            .param(ParamSpec::optional("x", TypeTag::Integer))
            .build();
        assert!(registry.register(descriptor).is_err());
    }

    #[test]
    fn test_definition_wraps_scalar_output() {
        let descriptor = ToolDescriptor::builder("echo", noop())
            .param(ParamSpec::required("text", TypeTag::String))
            .returns(TypeTag::String)
            .build();
        let def = descriptor.definition();
        assert_eq!(def.input_schema["required"], json!(["text"]));
        assert_eq!(
            def.output_schema.unwrap()["properties"]["result"]["type"],
            "string"
        );
    }
}
