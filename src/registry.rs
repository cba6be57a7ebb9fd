//! Snapshot of the tools offered by the tool server.

use crate::error::{AppError, Result};
use crate::ingestion::{atomize_tools, ToolDescriptor};
use crate::server::ToolServer;

/// Read-only catalog built once per session.
///
/// Tool ids are positions in `tools`; they are stable for the lifetime of the
/// snapshot and are what the vector index stores.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Query the server's catalog.
    ///
    /// Any failure, including an empty catalog, is `RegistryUnavailable`: a
    /// partial registry is never returned.
    pub async fn load(server: &dyn ToolServer) -> Result<Self> {
        let response = server
            .list_tools()
            .await
            .map_err(|e| AppError::RegistryUnavailable(e.to_string()))?;

        let tools =
            atomize_tools(&response).map_err(|e| AppError::RegistryUnavailable(e.to_string()))?;

        if tools.is_empty() {
            return Err(AppError::RegistryUnavailable(
                "tool server advertised no tools".to_string(),
            ));
        }

        tracing::info!(tools = tools.len(), "Tool registry loaded");
        Ok(Self { tools })
    }

    pub fn from_descriptors(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn by_id(&self, id: usize) -> Option<&ToolDescriptor> {
        self.tools.get(id)
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
    use crate::server::{Arguments, BuiltinServer};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Unreachable;

    #[async_trait]
    impl ToolServer for Unreachable {
        async fn list_tools(&self) -> Result<Value> {
            Err(AppError::IndexError("connection refused".into()))
        }

        async fn call_tool(&self, name: &str, _arguments: &Arguments) -> Result<Value> {
            Err(AppError::UnknownTool(name.into()))
        }
    }

    struct Empty;

    #[async_trait]
    impl ToolServer for Empty {
        async fn list_tools(&self) -> Result<Value> {
            Ok(json!({ "result": { "tools": [] } }))
        }

        async fn call_tool(&self, name: &str, _arguments: &Arguments) -> Result<Value> {
            Err(AppError::UnknownTool(name.into()))
        }
    }

    /// Advertises one good tool, one with an `object` parameter and one with
    /// a long description.
    struct Mixed;

    #[async_trait]
    impl ToolServer for Mixed {
        async fn list_tools(&self) -> Result<Value> {
            Ok(json!({ "result": { "tools": [
                { "name": "add", "description": "Add two numbers" },
                {
                    "name": "configure",
                    "inputSchema": { "properties": { "config": { "type": "object" } } }
                },
                { "name": "long", "description": "x".repeat(800) }
            ] } }))
        }

        async fn call_tool(&self, name: &str, _arguments: &Arguments) -> Result<Value> {
            Err(AppError::UnknownTool(name.into()))
        }
    }

    #[tokio::test]
    async fn test_load_reflects_server_catalog() {
        let server = BuiltinServer::only(&["add", "subtract", "to_upper"]);
        let registry = ToolRegistry::load(&server).await.unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.list(), server.descriptors().as_slice());
        assert_eq!(registry.by_id(2).unwrap().name, "to_upper");
        assert!(registry.get("divide").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_registry_unavailable() {
        let err = ToolRegistry::load(&Unreachable).await.unwrap_err();
        assert!(matches!(err, AppError::RegistryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_registry_unavailable() {
        let err = ToolRegistry::load(&Empty).await.unwrap_err();
        assert!(matches!(err, AppError::RegistryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unsupported_tool_fails_whole_catalog() {
        let err = ToolRegistry::load(&Mixed).await.unwrap_err();
        assert!(matches!(err, AppError::RegistryUnavailable(ref msg) if msg.contains("configure")));
    }
}
