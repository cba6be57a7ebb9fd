//! The tool-serving collaborator.
//!
//! The rest of the crate only sees the `ToolServer` contract: a `tools/list`
//! call returning the catalog as JSON and a `tools/call` taking a name plus an
//! argument object. The transport behind it is opaque; `BuiltinServer` is the
//! in-process implementation used by the binary and the tests.

pub mod builtin;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use builtin::BuiltinServer;

/// Argument object passed to `call_tool`.
pub type Arguments = Map<String, Value>;

#[async_trait]
pub trait ToolServer: Send + Sync {
    /// `tools/list`: JSON-RPC response whose `result.tools` describes the
    /// catalog (name, description, inputSchema).
    async fn list_tools(&self) -> Result<Value>;

    /// `tools/call`: run a tool. Tool-side validation failures are reported
    /// as `AppError::InvalidArgument`.
    async fn call_tool(&self, name: &str, arguments: &Arguments) -> Result<Value>;
}

/// Render a tool result for the console: strings without quotes, everything
/// else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("HELLO")), "HELLO");
        assert_eq!(display_value(&json!(12)), "12");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!([1, 2])), "[1,2]");
    }
}
