//! Tool schemas, calls, results, and the registry.
//!
//! The tool set is closed: every tool the model can invoke is one of the
//! [`ToolKind`] variants, and the [`ToolRegistry`] holds exactly one
//! [`ToolSchema`] per registered kind. The registry is built once at startup
//! and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use crate::provider::ToolDefinition;

/// The closed set of tool kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Plan,
    Message,
    Shell,
    File,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [ToolKind::Plan, ToolKind::Message, ToolKind::Shell, ToolKind::File];

    /// The identifier the model uses to invoke this tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Plan => "plan",
            ToolKind::Message => "message",
            ToolKind::Shell => "shell",
            ToolKind::File => "file",
        }
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// JSON type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Array,
    Object,
}

impl FieldType {
    fn json_name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.as_i64().is_some(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

/// One named input field of a tool.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: &'static str,
    pub ty: FieldType,
    pub description: &'static str,
    pub allowed: Option<&'static [&'static str]>,
    pub required: bool,
    pub default: Option<Value>,
    /// JSON Schema for array items, if any
    pub items: Option<Value>,
}

impl FieldSchema {
    fn new(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            description,
            allowed: None,
            required: false,
            default: None,
            items: None,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::String, description)
    }

    pub fn integer(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Integer, description)
    }

    pub fn array(name: &'static str, description: &'static str, items: Value) -> Self {
        let mut field = Self::new(name, FieldType::Array, description);
        field.items = Some(items);
        field
    }

    pub fn object(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Object, description)
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), Value::from(self.ty.json_name()));
        prop.insert("description".into(), Value::from(self.description));
        if let Some(allowed) = self.allowed {
            prop.insert("enum".into(), Value::from(allowed.to_vec()));
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        if let Some(items) = &self.items {
            prop.insert("items".into(), items.clone());
        }
        Value::Object(prop)
    }
}

/// The declared input shape of one tool.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub kind: ToolKind,
    pub description: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl ToolSchema {
    pub fn new(kind: ToolKind, description: &'static str, fields: Vec<FieldSchema>) -> Self {
        Self { kind, description, fields }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Render the input shape as a JSON Schema object.
    pub fn parameters_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.to_json_schema()))
            .collect();
        let required: Vec<&str> = self.fields.iter().filter(|f| f.required).map(|f| f.name).collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert this schema into a ToolDefinition for sending to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description.to_string(),
            parameters: self.parameters_schema(),
        }
    }

    /// Check `input` against the declared fields and fill in defaults.
    ///
    /// Null-valued fields are treated as absent. Fields not declared in the
    /// schema are passed through untouched.
    pub fn prepare_input(&self, input: &Value) -> Result<Value, String> {
        let mut object = match input {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => return Err(format!("{} input must be an object, got {other}", self.name())),
        };
        object.retain(|_, v| !v.is_null());

        for field in &self.fields {
            match object.get(field.name) {
                Some(value) => {
                    if !field.ty.accepts(value) {
                        return Err(format!(
                            "field '{}' must be of type {}",
                            field.name,
                            field.ty.json_name()
                        ));
                    }
                    if let (Some(allowed), Some(s)) = (field.allowed, value.as_str())
                        && !allowed.contains(&s)
                    {
                        return Err(format!(
                            "field '{}' must be one of [{}], got '{s}'",
                            field.name,
                            allowed.join(", ")
                        ));
                    }
                }
                None => {
                    if let Some(default) = &field.default {
                        object.insert(field.name.to_string(), default.clone());
                    } else if field.required {
                        return Err(format!("missing required field '{}'", field.name));
                    }
                }
            }
        }

        Ok(Value::Object(object))
    }
}

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id (matches the model's tool_use id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Input as a JSON value
    pub input: Value,
}

/// Outcome status of a dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Classification of an `error` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchErrorKind {
    /// The call named a tool that is not registered.
    UnknownTool,
    /// A recognized tool's handler failed.
    HandlerFailure,
    /// `plan.advance` was requested before any plan existed.
    NoActivePlan,
}

/// The result of a dispatched tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    pub status: ToolStatus,

    /// Set when `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<DispatchErrorKind>,

    /// Tool-specific structured data
    pub payload: Value,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, payload: Value) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Success,
            error_kind: None,
            payload,
        }
    }

    pub fn error(call_id: impl Into<String>, kind: DispatchErrorKind, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Error,
            error_kind: Some(kind),
            payload: serde_json::json!({ "kind": kind, "message": message.into() }),
        }
    }

    /// Merge extra structured fields into an object payload.
    pub fn with_details(mut self, details: Value) -> Self {
        if let (Value::Object(payload), Value::Object(extra)) = (&mut self.payload, details) {
            payload.extend(extra);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// The text sent back to the model in the tool-result turn.
    pub fn to_content(&self) -> String {
        let mut body = Map::new();
        body.insert("status".into(), serde_json::json!(self.status));
        match &self.payload {
            Value::Object(fields) => body.extend(fields.clone()),
            other => {
                body.insert("result".into(), other.clone());
            }
        }
        Value::Object(body).to_string()
    }
}

/// The static set of tool schemas exposed to the model.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    schemas: Vec<ToolSchema>,
}

impl ToolRegistry {
    /// Build a registry. A later schema for the same kind replaces an earlier one.
    pub fn new(schemas: impl IntoIterator<Item = ToolSchema>) -> Self {
        let mut ordered: Vec<ToolSchema> = Vec::new();
        for schema in schemas {
            match ordered.iter_mut().find(|s| s.kind == schema.kind) {
                Some(existing) => *existing = schema,
                None => ordered.push(schema),
            }
        }
        Self { schemas: ordered }
    }

    /// Look up a schema by tool identifier.
    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        let kind: ToolKind = name.parse().ok()?;
        self.schemas.iter().find(|s| s.kind == kind)
    }

    /// All tool definitions, in registration order (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.schemas.iter().map(ToolSchema::to_definition).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&'static str> {
        self.schemas.iter().map(ToolSchema::name).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
