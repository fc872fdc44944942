//! Parameter schemas and argument validation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::types::{ArgumentViolation, ViolationKind};

/// Declared runtime type of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Any => "any",
        }
    }

    /// Does `value` satisfy this tag? `Integer` rejects fractional numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            TypeTag::String => value.is_string(),
            TypeTag::Integer => value.is_i64() || value.is_u64(),
            TypeTag::Number => value.is_number(),
            TypeTag::Boolean => value.is_boolean(),
            TypeTag::Array => value.is_array(),
            TypeTag::Object => value.is_object(),
            TypeTag::Any => true,
        }
    }

    /// JSON Schema fragment for this tag.
    pub fn json_schema(&self) -> Value {
        match self {
            TypeTag::Any => json!({}),
            other => json!({ "type": other.as_str() }),
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The JSON type name of a runtime value, as reported in violations.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub type_tag: TypeTag,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl ParamSpec {
    pub fn required(name: &str, type_tag: TypeTag) -> Self {
        Self {
            name: name.to_string(),
            type_tag,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: &str, type_tag: TypeTag) -> Self {
        Self {
            required: false,
            ..Self::required(name, type_tag)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = self.type_tag.json_schema();
        if let Some(description) = &self.description {
            schema["description"] = json!(description);
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

/// Render a parameter list as a JSON Schema object.
pub fn input_schema(params: &[ParamSpec], variadic: bool) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| (p.name.clone(), p.json_schema()))
        .collect();
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": variadic,
    })
}

/// Validate `args` against `params`, collecting every violation.
///
/// On success the returned map has defaults filled in for absent optional
/// parameters. Extra keys pass through only when `variadic` is set.
pub fn validate_arguments(
    params: &[ParamSpec],
    variadic: bool,
    mut args: Map<String, Value>,
) -> Result<Map<String, Value>, Vec<ArgumentViolation>> {
    let mut violations = Vec::new();
    let mut null_optionals = Vec::new();

    for spec in params {
        match args.get(&spec.name) {
            Some(value) if spec.type_tag.matches(value) => {}
            // An explicit null on an optional parameter means "not given".
            Some(Value::Null) if !spec.required => null_optionals.push(spec.name.clone()),
            Some(value) => violations.push(ArgumentViolation {
                param: spec.name.clone(),
                problem: ViolationKind::TypeMismatch,
                expected: Some(spec.type_tag.to_string()),
                found: Some(value_type_name(value).to_string()),
            }),
            None if spec.required => violations.push(ArgumentViolation {
                param: spec.name.clone(),
                problem: ViolationKind::Missing,
                expected: Some(spec.type_tag.to_string()),
                found: None,
            }),
            None => {}
        }
    }

    if !variadic {
        let mut unknown: Vec<&String> = args
            .keys()
            .filter(|k| !params.iter().any(|p| &p.name == *k))
            .collect();
        unknown.sort();
        violations.extend(unknown.into_iter().map(|k| ArgumentViolation {
            param: k.clone(),
            problem: ViolationKind::Unrecognized,
            expected: None,
            found: None,
        }));
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    for name in null_optionals {
        args.remove(&name);
    }

    for spec in params {
        if let Some(default) = &spec.default {
            args.entry(spec.name.clone())
                .or_insert_with(|| default.clone());
        }
    }

    Ok(args)
}
