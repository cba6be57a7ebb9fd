//! Vector index over tool embeddings.
//!
//! `build` replaces the index wholesale; there is no incremental insert.
//! Queries return candidates ordered by ascending cosine distance with ties
//! broken by insertion order.

pub mod exact;
pub mod hnsw;

use crate::error::{AppError, Result};
use crate::inference::Embedding;
use ndarray::Array2;
use std::collections::HashSet;

pub use hnsw::{AnnGraph, HnswParams};

/// One persisted row: a tool and its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub embedding: Embedding,
}

/// A ranked match for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: usize,
    pub name: String,
    pub distance: f32,
}

/// Which search path answers `query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Brute-force over every row.
    Exact,
    /// HNSW candidates re-scored exactly.
    Hnsw,
}

impl SearchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "exact" | "brute" | "brute-force" => Some(Self::Exact),
            "hnsw" | "ann" => Some(Self::Hnsw),
            _ => None,
        }
    }
}

pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    /// Row i holds `entries[i].embedding`
    matrix: Array2<f32>,
    graph: Option<AnnGraph>,
    params: HnswParams,
    mode: SearchMode,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("entries", &self.entries.len())
            .field("params", &self.params)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// An empty, unbuilt index.
    pub fn new(params: HnswParams, mode: SearchMode) -> Self {
        Self {
            entries: Vec::new(),
            matrix: Array2::zeros((0, 0)),
            graph: None,
            params,
            mode,
        }
    }

    /// Replace the index contents with `entries`.
    ///
    /// # Errors
    /// `InvalidArgument` on duplicate ids or mixed embedding dimensions. The
    /// previous contents are kept on error.
    pub fn build(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
        let dim = entries.first().map(|e| e.embedding.dim()).unwrap_or(0);

        let mut ids = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !ids.insert(entry.id) {
                return Err(AppError::InvalidArgument(format!(
                    "duplicate index id {}",
                    entry.id
                )));
            }
            if entry.embedding.dim() != dim {
                return Err(AppError::InvalidArgument(format!(
                    "entry '{}' has dimension {}, expected {}",
                    entry.name,
                    entry.embedding.dim(),
                    dim
                )));
            }
        }

        let mut matrix = Array2::<f32>::zeros((entries.len(), dim));
        for (mut row, entry) in matrix.outer_iter_mut().zip(entries.iter()) {
            row.assign(&entry.embedding.view());
        }

        let graph = if entries.is_empty() {
            None
        } else {
            Some(AnnGraph::build(
                entries.iter().map(|e| e.embedding.as_slice()),
                self.params,
            ))
        };

        self.entries = entries;
        self.matrix = matrix;
        self.graph = graph;

        tracing::info!(entries = self.entries.len(), dim, "Vector index built");
        metrics::gauge!("index_build_entries").set(self.entries.len() as f64);
        Ok(())
    }

    /// The `k` nearest entries under cosine distance, using the configured
    /// search mode.
    ///
    /// # Errors
    /// `InvalidArgument` if `k < 1`, the index is empty, or the vector's
    /// dimension does not match.
    pub fn query(&self, vector: &Embedding, k: usize) -> Result<Vec<Candidate>> {
        match self.mode {
            SearchMode::Exact => self.query_exact(vector, k),
            SearchMode::Hnsw => self.query_ann(vector, k),
        }
    }

    /// Brute-force reference search.
    pub fn query_exact(&self, vector: &Embedding, k: usize) -> Result<Vec<Candidate>> {
        self.validate_query(vector, k)?;
        let ranked = exact::rank(&self.matrix, vector.view(), k);
        Ok(self.candidates(ranked))
    }

    /// HNSW search with exact re-scoring of the proposed rows.
    pub fn query_ann(&self, vector: &Embedding, k: usize) -> Result<Vec<Candidate>> {
        self.validate_query(vector, k)?;
        let Some(graph) = &self.graph else {
            return self.query_exact(vector, k);
        };

        let fetch = k.max(self.params.ef_search);
        let mut rows = graph.candidates(vector.as_slice(), fetch);
        // Sorting row ids first makes the stable distance sort below break
        // ties by insertion order.
        rows.sort_unstable();
        rows.dedup();

        let mut scored: Vec<(usize, f32)> = rows
            .into_iter()
            .filter(|&row| row < self.entries.len())
            .map(|row| (row, 1.0 - self.matrix.row(row).dot(&vector.view())))
            .collect();
        // A sparse graph can propose fewer rows than asked for
        let wanted = k.min(self.entries.len());
        if scored.len() < wanted {
            tracing::debug!(
                proposed = scored.len(),
                wanted,
                "HNSW returned too few rows, using exact search"
            );
            return self.query_exact(vector, k);
        }

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(self.candidates(scored))
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn params(&self) -> HnswParams {
        self.params
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    fn validate_query(&self, vector: &Embedding, k: usize) -> Result<()> {
        if k < 1 {
            return Err(AppError::InvalidArgument("k must be at least 1".to_string()));
        }
        if self.entries.is_empty() {
            return Err(AppError::InvalidArgument(
                "vector index is empty or not built".to_string(),
            ));
        }
        if vector.dim() != self.dimension() {
            return Err(AppError::InvalidArgument(format!(
                "query vector has dimension {}, index has {}",
                vector.dim(),
                self.dimension()
            )));
        }
        Ok(())
    }

    fn candidates(&self, ranked: Vec<(usize, f32)>) -> Vec<Candidate> {
        ranked
            .into_iter()
            .map(|(row, distance)| {
                let entry = &self.entries[row];
                Candidate {
                    id: entry.id,
                    name: entry.name.clone(),
                    distance,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{Encoder, HashingEncoder};

    fn entries(texts: &[&str]) -> Vec<IndexEntry> {
        let encoder = HashingEncoder::default();
        texts
            .iter()
            .enumerate()
            .map(|(id, text)| IndexEntry {
                id,
                name: format!("tool_{}", id),
                description: text.to_string(),
                embedding: encoder.encode(text).unwrap(),
            })
            .collect()
    }

    fn built(texts: &[&str], mode: SearchMode) -> VectorIndex {
        let mut index = VectorIndex::new(HnswParams::default(), mode);
        index.build(entries(texts)).unwrap();
        index
    }

    const TEXTS: &[&str] = &[
        "add: Add two numbers",
        "subtract: Subtract two numbers",
        "to_upper: Convert text to UPPERCASE",
        "reverse_text: Return text reversed",
        "get_weather: (Stub) Always returns sunny for the demo",
    ];

    #[test]
    fn test_query_before_build_is_invalid() {
        let index = VectorIndex::new(HnswParams::default(), SearchMode::Hnsw);
        let v = HashingEncoder::default().encode("add").unwrap();
        assert!(matches!(index.query(&v, 3), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_k_is_invalid() {
        let index = built(TEXTS, SearchMode::Exact);
        let v = HashingEncoder::default().encode("add").unwrap();
        assert!(matches!(index.query(&v, 0), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_returns_k_or_fewer_sorted() {
        for mode in [SearchMode::Exact, SearchMode::Hnsw] {
            let index = built(TEXTS, mode);
            let v = HashingEncoder::default().encode("numbers").unwrap();

            let top3 = index.query(&v, 3).unwrap();
            assert_eq!(top3.len(), 3);
            assert!(top3.windows(2).all(|w| w[0].distance <= w[1].distance));

            let all = index.query(&v, 50).unwrap();
            assert_eq!(all.len(), TEXTS.len());
        }
    }

    #[test]
    fn test_self_similarity() {
        for mode in [SearchMode::Exact, SearchMode::Hnsw] {
            let index = built(TEXTS, mode);
            for entry in index.entries() {
                let top = index.query(&entry.embedding, 1).unwrap();
                assert_eq!(top[0].id, entry.id);
                assert!(top[0].distance.abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let mut list = entries(&["same text", "other words", "same text"]);
        list[0].id = 10;
        list[1].id = 5;
        list[2].id = 7;
        for mode in [SearchMode::Exact, SearchMode::Hnsw] {
            let mut index = VectorIndex::new(HnswParams::default(), mode);
            index.build(list.clone()).unwrap();
            let top = index.query(&list[0].embedding, 2).unwrap();
            assert_eq!(top[0].id, 10);
            assert_eq!(top[1].id, 7);
        }
    }

    #[test]
    fn test_build_replaces_previous_contents() {
        let mut index = built(TEXTS, SearchMode::Hnsw);
        index.build(entries(&["only one"])).unwrap();
        assert_eq!(index.len(), 1);
        let v = HashingEncoder::default().encode("add").unwrap();
        assert_eq!(index.query(&v, 3).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut list = entries(&["a", "b"]);
        list[1].id = list[0].id;
        let mut index = VectorIndex::new(HnswParams::default(), SearchMode::Exact);
        assert!(index.build(list).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let index = built(TEXTS, SearchMode::Exact);
        let v = HashingEncoder::new(8).encode("add").unwrap();
        assert!(matches!(index.query(&v, 1), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_sparse_graph_still_returns_k() {
        let texts: Vec<String> = (0..300).map(|i| format!("tool{} group{}", i, i % 13)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let v = HashingEncoder::default().encode("group3").unwrap();

        for params in [
            HnswParams { max_connections: 1, ef_construction: 4, ef_search: 1 },
            HnswParams { max_connections: 2, ef_construction: 4, ef_search: 1 },
        ] {
            let mut small = VectorIndex::new(params, SearchMode::Hnsw);
            small.build(entries(&TEXTS[..3])).unwrap();
            assert_eq!(small.query(&v, 3).unwrap().len(), 3);

            let mut large = VectorIndex::new(params, SearchMode::Hnsw);
            large.build(entries(&refs)).unwrap();
            let top = large.query(&v, 250).unwrap();
            assert_eq!(top.len(), 250);
            assert!(top.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }

    #[test]
    fn test_hnsw_recall_against_exact() {
        let texts: Vec<String> = (0..200)
            .map(|i| format!("tool{} group{} family{} kind{}", i, i % 7, i % 11, i % 5))
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let index = built(&refs, SearchMode::Hnsw);
        let encoder = HashingEncoder::default();

        let k = 5;
        let mut hits = 0;
        let mut total = 0;
        for q in 0..40 {
            let query = encoder
                .encode(&format!("group{} family{} kind{}", q % 7, q % 11, q % 5))
                .unwrap();
            let exact: HashSet<usize> =
                index.query_exact(&query, k).unwrap().into_iter().map(|c| c.id).collect();
            let approx = index.query_ann(&query, k).unwrap();
            hits += approx.iter().filter(|c| exact.contains(&c.id)).count();
            total += k;
        }

        let recall = hits as f64 / total as f64;
        assert!(recall >= 0.9, "recall {} below 0.9", recall);
    }
}
