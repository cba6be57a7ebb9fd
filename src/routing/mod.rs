//! Query routing: free text to the best-matching tool.
//!
//! The query is embedded with the encoder that built the index and the
//! nearest tools are fetched from the vector index. Rank 1 wins. By default
//! there is no confidence threshold, so nonsense queries still route
//! somewhere; `max_distance` turns that into a `NoConfidentMatch` error.

pub mod keyword;

use crate::error::{AppError, Result};
use crate::index::{Candidate, VectorIndex};
use crate::inference::Encoder;
use crate::ingestion::ToolDescriptor;
use crate::registry::ToolRegistry;
use std::sync::Arc;

pub use keyword::KeywordFilter;

/// Number of candidates fetched per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Result of routing a query.
#[derive(Debug, Clone)]
pub struct Route {
    /// Nearest tools by ascending distance; `candidates[0]` is the winner.
    pub candidates: Vec<Candidate>,
    pub tool: ToolDescriptor,
}

impl Route {
    pub fn distance(&self) -> f32 {
        self.candidates.first().map(|c| c.distance).unwrap_or(f32::INFINITY)
    }
}

pub struct QueryRouter {
    encoder: Arc<dyn Encoder>,
    top_k: usize,
    max_distance: Option<f32>,
}

impl QueryRouter {
    pub fn new(encoder: Arc<dyn Encoder>, top_k: usize, max_distance: Option<f32>) -> Self {
        Self {
            encoder,
            top_k,
            max_distance,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn max_distance(&self) -> Option<f32> {
        self.max_distance
    }

    /// Route `query` to a tool of `registry` using `index`.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty query or an unusable index
    /// - `ModelError` / `TokenizationError` from the encoder
    /// - `NoConfidentMatch` when a threshold is set and rank 1 exceeds it
    pub async fn route(
        &self,
        query: &str,
        index: &VectorIndex,
        registry: &ToolRegistry,
    ) -> Result<Route> {
        let start_time = std::time::Instant::now();

        if query.trim().is_empty() {
            return Err(AppError::InvalidArgument("Query cannot be empty".to_string()));
        }

        let encoder = Arc::clone(&self.encoder);
        let text = query.to_string();
        let vector = tokio::task::spawn_blocking(move || encoder.encode(&text))
            .await
            .map_err(|e| AppError::ModelError(format!("Encoder task join error: {}", e)))??;

        let candidates = index.query(&vector, self.top_k)?;
        let best = candidates
            .first()
            .ok_or_else(|| AppError::IndexError("index returned no candidates".to_string()))?;

        let tool = registry.by_id(best.id).cloned().ok_or_else(|| {
            AppError::IndexError(format!(
                "index entry {} ('{}') is not in the registry",
                best.id, best.name
            ))
        })?;

        if let Some(limit) = self.max_distance {
            if best.distance > limit {
                return Err(AppError::NoConfidentMatch {
                    name: best.name.clone(),
                    distance: best.distance,
                });
            }
        }

        tracing::debug!(
            tool = %tool.name,
            distance = best.distance,
            candidates = candidates.len(),
            elapsed_us = start_time.elapsed().as_micros() as u64,
            "Query routed"
        );

        Ok(Route { candidates, tool })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{HnswParams, IndexEntry, SearchMode};
    use crate::inference::HashingEncoder;
    use crate::server::BuiltinServer;

    fn setup(encoder: &Arc<dyn Encoder>) -> (ToolRegistry, VectorIndex) {
        let registry = ToolRegistry::from_descriptors(BuiltinServer::new().descriptors());
        let entries = registry
            .list()
            .iter()
            .enumerate()
            .map(|(id, tool)| IndexEntry {
                id,
                name: tool.name.clone(),
                description: tool.description.clone(),
                embedding: encoder.encode(&tool.embedding_text()).unwrap(),
            })
            .collect();
        let mut index = VectorIndex::new(HnswParams::default(), SearchMode::Exact);
        index.build(entries).unwrap();
        (registry, index)
    }

    #[tokio::test]
    async fn test_route_returns_top_candidates() {
        let encoder: Arc<dyn Encoder> = Arc::new(HashingEncoder::default());
        let (registry, index) = setup(&encoder);
        let router = QueryRouter::new(encoder, DEFAULT_TOP_K, None);

        let route = router.route("reverse_text", &index, &registry).await.unwrap();
        assert_eq!(route.candidates.len(), 3);
        assert_eq!(route.tool.name, route.candidates[0].name);
        assert_eq!(route.tool.name, "reverse_text");
    }

    #[tokio::test]
    async fn test_route_always_answers_without_threshold() {
        let encoder: Arc<dyn Encoder> = Arc::new(HashingEncoder::default());
        let (registry, index) = setup(&encoder);
        let router = QueryRouter::new(encoder, DEFAULT_TOP_K, None);

        let route = router.route("zzqx blorf", &index, &registry).await.unwrap();
        assert!(registry.get(&route.tool.name).is_some());
    }

    #[tokio::test]
    async fn test_threshold_rejects_far_matches() {
        let encoder: Arc<dyn Encoder> = Arc::new(HashingEncoder::default());
        let (registry, index) = setup(&encoder);
        let router = QueryRouter::new(encoder, DEFAULT_TOP_K, Some(0.0));

        let result = router.route("zzqx blorf", &index, &registry).await;
        assert!(matches!(result, Err(AppError::NoConfidentMatch { .. })));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let encoder: Arc<dyn Encoder> = Arc::new(HashingEncoder::default());
        let (registry, index) = setup(&encoder);
        let router = QueryRouter::new(encoder, DEFAULT_TOP_K, None);

        assert!(matches!(
            router.route("   ", &index, &registry).await,
            Err(AppError::InvalidArgument(_))
        ));
    }
}
