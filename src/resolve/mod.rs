//! Argument resolution: maps a free-text query onto a tool's parameters.
//!
//! Strategies are looked up by tool name. Tools without a registered
//! strategy are filled in manually.

pub mod completion;
pub mod extract;
pub mod strategy;

use crate::ingestion::ToolDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

pub use completion::{coerce, ResolvedArgs};
pub use extract::{colon_text, extract_location, extract_numbers};
pub use strategy::{
    ArgumentResolver, BinaryNumeric, BoundedRange, FreeText, Location, Manual, NoArguments,
    NumberList, ParsedQuery, SingleNumber,
};

/// Tool name -> resolution strategy.
pub struct ResolverTable {
    strategies: HashMap<String, Arc<dyn ArgumentResolver>>,
    fallback: Arc<dyn ArgumentResolver>,
}

impl ResolverTable {
    /// An empty table; every tool falls back to manual fill-in.
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
            fallback: Arc::new(Manual),
        }
    }

    /// Table covering the built-in tool catalog.
    pub fn with_builtin_strategies() -> Self {
        let binary: Arc<dyn ArgumentResolver> = Arc::new(BinaryNumeric);
        let single: Arc<dyn ArgumentResolver> = Arc::new(SingleNumber);
        let text: Arc<dyn ArgumentResolver> = Arc::new(FreeText);

        let mut table = Self::new();
        for name in ["add", "subtract", "multiply", "divide"] {
            table.register(name, binary.clone());
        }
        for name in ["factorial", "sqrt"] {
            table.register(name, single.clone());
        }
        for name in ["count_characters", "to_upper", "to_lower", "reverse_text", "word_count"] {
            table.register(name, text.clone());
        }
        table.register("random_int", Arc::new(BoundedRange::default()));
        table.register("current_datetime", Arc::new(NoArguments));
        table.register("get_weather", Arc::new(Location));
        table.register("average", Arc::new(NumberList));
        table
    }

    /// Register (or replace) the strategy for `tool`.
    pub fn register(&mut self, tool: impl Into<String>, strategy: Arc<dyn ArgumentResolver>) {
        self.strategies.insert(tool.into(), strategy);
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.strategies.contains_key(tool)
    }

    /// Resolve `query` against `tool`'s parameters.
    ///
    /// Pure: the same `(tool, query)` always yields the same result.
    pub fn resolve(&self, tool: &ToolDescriptor, query: &str) -> ResolvedArgs {
        let parsed = ParsedQuery::new(query);
        let strategy = self.strategies.get(&tool.name).unwrap_or(&self.fallback);
        let resolved = ResolvedArgs::new(tool, strategy.resolve(tool, &parsed));

        tracing::debug!(
            tool = %tool.name,
            numbers = parsed.numbers.len(),
            resolved = resolved.values().len(),
            missing = resolved.missing().len(),
            "Arguments resolved"
        );

        resolved
    }
}

impl Default for ResolverTable {
    fn default() -> Self {
        Self::with_builtin_strategies()
    }
}
