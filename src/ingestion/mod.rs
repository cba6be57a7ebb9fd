//! Ingestion module for processing tool catalogs.
//!
//! Transforms the tool server's `tools/list` response into typed
//! `ToolDescriptor` records used by the registry, the index and the resolver.

pub mod atomizer;
pub mod types;

pub use atomizer::{atomize_tools, tools_list_response, AtomizerResult};
pub use types::{ParameterKind, ParameterSpec, ToolDescriptor};
