//! Type definitions for the ingestion module.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Closed set of parameter types a tool may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Any JSON number (float semantics).
    Number,
    /// Integral JSON number.
    Integer,
    String,
    ListOfNumber,
}

impl ParameterKind {
    /// JSON Schema fragment describing this kind.
    pub fn json_schema(&self) -> Value {
        match self {
            ParameterKind::Number => json!({ "type": "number" }),
            ParameterKind::Integer => json!({ "type": "integer" }),
            ParameterKind::String => json!({ "type": "string" }),
            ParameterKind::ListOfNumber => json!({ "type": "array", "items": { "type": "number" } }),
        }
    }

    /// Map a JSON Schema property back to a kind.
    ///
    /// Returns `None` for shapes outside the closed set (objects, nested
    /// arrays, arrays of strings, ...).
    pub fn from_json_schema(prop: &Value) -> Option<Self> {
        match prop.get("type").and_then(|t| t.as_str())? {
            "number" => Some(ParameterKind::Number),
            "integer" => Some(ParameterKind::Integer),
            "string" => Some(ParameterKind::String),
            "array" => {
                let item_type = prop
                    .get("items")
                    .and_then(|i| i.get("type"))
                    .and_then(|t| t.as_str());
                match item_type {
                    Some("number") | Some("integer") => Some(ParameterKind::ListOfNumber),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterKind::Number | ParameterKind::Integer)
    }

    /// Represent a parsed number as a JSON value for this kind.
    ///
    /// Integer parameters get a JSON integer when the value is integral;
    /// fractional values are kept as floats so the tool can reject them.
    pub fn number_value(&self, n: f64) -> Value {
        match self {
            ParameterKind::Integer if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                json!(n as i64)
            }
            _ => json!(n),
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParameterKind::Number => "number",
            ParameterKind::Integer => "integer",
            ParameterKind::String => "string",
            ParameterKind::ListOfNumber => "number[]",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// A tool as advertised by the tool server.
///
/// Immutable once registered; the registry hands out shared references only.
/// `parameters` keeps the declaration order of the tool's signature, which is
/// also the order operators are prompted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Text fed to the encoder when building the index.
    /// Format: "<name>: <description>"
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }

    /// MCP `inputSchema` object for this tool.
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            properties.insert(param.name.clone(), param.kind.json_schema());
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// One-line signature, e.g. `add(a: integer, b: integer)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let marker = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, marker, p.kind)
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}
