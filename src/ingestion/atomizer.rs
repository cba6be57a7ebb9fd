//! Tool atomization: turning a `tools/list` response into `ToolDescriptor`s.
//!
//! Tool servers describe their catalog as MCP-style JSON: every tool has a
//! `name`, an optional `description` and an `inputSchema` whose `properties`
//! list the parameters in declaration order. This module maps that shape onto
//! the closed `ParameterKind` set.

use crate::error::AppError;
use crate::ingestion::types::{ParameterKind, ParameterSpec, ToolDescriptor};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Result type for atomizer operations
pub type AtomizerResult<T> = std::result::Result<T, AppError>;

/// Transform a `tools/list` response into tool descriptors.
///
/// Accepts either a full JSON-RPC envelope (`result.tools`) or a bare
/// `{"tools": [...]}` object.
///
/// # Errors
/// Returns `AppError::AtomizerError` if the JSON carries no tools array, or if
/// any tool is malformed, uses an unsupported parameter schema, or repeats an
/// earlier tool's name. The catalog is taken whole or not at all.
pub fn atomize_tools(json: &Value) -> AtomizerResult<Vec<ToolDescriptor>> {
    let tools_array = extract_tools_array(json)?;

    let mut results = Vec::with_capacity(tools_array.len());
    let mut seen = HashSet::new();

    for (idx, tool_value) in tools_array.iter().enumerate() {
        let tool = normalize_tool(tool_value).map_err(|e| {
            tracing::warn!(index = idx, error = %e, "Malformed tool definition");
            e
        })?;
        if !seen.insert(tool.name.clone()) {
            return Err(AppError::AtomizerError(format!(
                "Duplicate tool name '{}' at index {}",
                tool.name, idx
            )));
        }
        results.push(tool);
    }

    tracing::debug!(tools = results.len(), "Tool atomization complete");

    Ok(results)
}

/// Render descriptors back into a JSON-RPC `tools/list` response.
pub fn tools_list_response(tools: &[ToolDescriptor]) -> Value {
    let tools: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": t.input_schema(),
            })
        })
        .collect();

    json!({
        "jsonrpc": "2.0",
        "result": { "tools": tools }
    })
}

fn extract_tools_array(json: &Value) -> AtomizerResult<&Vec<Value>> {
    json.get("result")
        .and_then(|r| r.get("tools"))
        .or_else(|| json.get("tools"))
        .and_then(|t| t.as_array())
        .ok_or_else(|| {
            AppError::AtomizerError("Expected 'result.tools' array in tools/list response".into())
        })
}

fn normalize_tool(tool_value: &Value) -> AtomizerResult<ToolDescriptor> {
    let name = tool_value
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            AppError::AtomizerError(format!(
                "Tool missing required 'name' field: {:?}",
                tool_value.get("name")
            ))
        })?;

    let description = tool_value
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    let parameters = parse_parameters(name, tool_value.get("inputSchema"))?;

    Ok(ToolDescriptor::new(name, description, parameters))
}

/// Parse `inputSchema.properties` into parameter specs, keeping their order.
fn parse_parameters(tool: &str, input_schema: Option<&Value>) -> AtomizerResult<Vec<ParameterSpec>> {
    let Some(schema) = input_schema else {
        return Ok(Vec::new());
    };

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(Vec::new());
    };

    let required: HashSet<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| {
            let kind = ParameterKind::from_json_schema(prop).ok_or_else(|| {
                AppError::AtomizerError(format!(
                    "Tool '{}' parameter '{}' has unsupported schema {}",
                    tool, name, prop
                ))
            })?;
            Ok(ParameterSpec {
                name: name.clone(),
                kind,
                required: required.contains(name.as_str()),
            })
        })
        .collect()
}
