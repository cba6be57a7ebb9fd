use crate::config::Config;
use crate::error::{AppError, Result};
use crate::index::{IndexEntry, VectorIndex};
use crate::inference::Encoder;
use crate::ingestion::ToolDescriptor;
use crate::persistence::{remove_index_file, save_index};
use crate::registry::ToolRegistry;
use crate::resolve::{ArgumentResolver, ResolvedArgs, ResolverTable};
use crate::routing::{KeywordFilter, QueryRouter, Route};
use crate::server::{Arguments, ToolServer};
use serde_json::Value;
use std::sync::Arc;

/// A routed query with its (possibly incomplete) arguments.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub route: Route,
    pub args: ResolvedArgs,
}

impl PreparedCall {
    pub fn tool(&self) -> &ToolDescriptor {
        &self.route.tool
    }
}

/// Everything one interactive session needs, built once at startup.
///
/// The registry snapshot and the vector index are read-only after `start`;
/// queries are handled one at a time by the caller.
pub struct Session {
    registry: ToolRegistry,
    index: VectorIndex,
    router: QueryRouter,
    resolvers: ResolverTable,
    keywords: KeywordFilter,
    server: Arc<dyn ToolServer>,
    config: Arc<Config>,
}

impl Session {
    /// Load the catalog, embed it, and build and persist a fresh index.
    ///
    /// Any previous index file is deleted first. Every error here is fatal
    /// to the session.
    pub async fn start(
        config: Config,
        server: Arc<dyn ToolServer>,
        encoder: Arc<dyn Encoder>,
    ) -> Result<Self> {
        let start_time = std::time::Instant::now();

        remove_index_file(&config.index_path)?;

        let registry = ToolRegistry::load(server.as_ref()).await?;

        let texts: Vec<String> = registry.list().iter().map(|t| t.embedding_text()).collect();
        let batch_encoder = Arc::clone(&encoder);
        let embeddings = tokio::task::spawn_blocking(move || batch_encoder.encode_batch(&texts))
            .await
            .map_err(|e| AppError::ModelError(format!("Index build task join error: {}", e)))??;

        let entries: Vec<IndexEntry> = registry
            .list()
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(id, (tool, embedding))| IndexEntry {
                id,
                name: tool.name.clone(),
                description: tool.description.clone(),
                embedding,
            })
            .collect();

        let mut index = VectorIndex::new(config.hnsw, config.search_mode);
        index.build(entries)?;
        save_index(&config.index_path, &index)?;

        tracing::info!(
            tools = registry.len(),
            encoder = encoder.name(),
            search_mode = ?config.search_mode,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Session ready"
        );

        Ok(Self {
            registry,
            index,
            router: QueryRouter::new(encoder, config.top_k, config.max_distance),
            resolvers: ResolverTable::with_builtin_strategies(),
            keywords: KeywordFilter::with_builtin_keywords(),
            server,
            config: Arc::new(config),
        })
    }

    /// Register a resolution strategy for a tool, replacing the default.
    pub fn register_resolver(&mut self, tool: impl Into<String>, strategy: Arc<dyn ArgumentResolver>) {
        self.resolvers.register(tool, strategy);
    }

    pub fn set_keywords(&mut self, keywords: KeywordFilter) {
        self.keywords = keywords;
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn keywords(&self) -> &KeywordFilter {
        &self.keywords
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Nearest tools for `query`, rank 1 selected.
    pub async fn route(&self, query: &str) -> Result<Route> {
        self.router.route(query, &self.index, &self.registry).await
    }

    /// Heuristic arguments for `tool` from `query`.
    pub fn resolve(&self, tool: &ToolDescriptor, query: &str) -> ResolvedArgs {
        self.resolvers.resolve(tool, query)
    }

    /// Route and resolve. The caller completes any missing parameters and
    /// then calls `invoke`.
    pub async fn prepare(&self, query: &str) -> Result<PreparedCall> {
        metrics::counter!("queries_total").increment(1);

        let route = match self.route(query).await {
            Ok(route) => route,
            Err(e) => {
                metrics::counter!("query_failures_total", "stage" => "route").increment(1);
                return Err(e);
            }
        };
        metrics::histogram!("route_distance").record(route.distance() as f64);

        let args = self.resolve(&route.tool, query);
        Ok(PreparedCall { route, args })
    }

    /// Call `tool` on the tool server.
    ///
    /// Tool-side failures come back as errors for the caller to report; the
    /// session itself stays usable.
    pub async fn invoke(&self, tool: &ToolDescriptor, args: &Arguments) -> Result<Value> {
        if self.registry.get(&tool.name).is_none() {
            return Err(AppError::UnknownTool(tool.name.clone()));
        }

        match self.server.call_tool(&tool.name, args).await {
            Ok(value) => {
                tracing::debug!(tool = %tool.name, "Tool call succeeded");
                Ok(value)
            }
            Err(e) => {
                metrics::counter!("query_failures_total", "stage" => "invoke").increment(1);
                tracing::warn!(tool = %tool.name, error = %e, "Tool call failed");
                Err(e)
            }
        }
    }
}
