//! HNSW (Hierarchical Navigable Small World) graph over the tool embeddings.
//!
//! The graph only proposes candidates. `VectorIndex` re-scores them exactly,
//! so approximate recall can lose a neighbour but never misorder the ones it
//! returns.

use hnsw_rs::prelude::*;

/// Upper bound on graph layers (hnsw_rs caps at 16).
const MAX_LAYERS: usize = 16;

/// Configuration for the HNSW graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HnswParams {
    /// Maximum number of connections per node (M)
    pub max_connections: usize,
    /// Candidate list size during construction
    pub ef_construction: usize,
    /// Candidate list size during search
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_connections: 16,
            ef_construction: 128,
            ef_search: 64,
        }
    }
}

pub struct AnnGraph {
    hnsw: Hnsw<'static, f32, DistCosine>,
    params: HnswParams,
    len: usize,
}

impl AnnGraph {
    /// Build a graph over `rows`; the data id of each row is its position.
    pub fn build<'a>(rows: impl ExactSizeIterator<Item = &'a [f32]>, params: HnswParams) -> Self {
        let len = rows.len();
        let mut hnsw = Hnsw::<'static, f32, DistCosine>::new(
            params.max_connections,
            len.max(1),
            MAX_LAYERS,
            params.ef_construction,
            DistCosine {},
        );

        for (id, row) in rows.enumerate() {
            hnsw.insert((row, id));
        }
        hnsw.set_searching_mode(true);

        tracing::debug!(
            points = len,
            max_connections = params.max_connections,
            ef_construction = params.ef_construction,
            "HNSW graph built"
        );

        Self { hnsw, params, len }
    }

    /// Row ids of (approximately) the `fetch` nearest rows.
    pub fn candidates(&self, query: &[f32], fetch: usize) -> Vec<usize> {
        let knbn = fetch.min(self.len);
        if knbn == 0 {
            return Vec::new();
        }
        let ef = self.params.ef_search.max(knbn);
        self.hnsw
            .search(query, knbn, ef)
            .into_iter()
            .map(|neighbour| neighbour.d_id)
            .collect()
    }

    pub fn params(&self) -> HnswParams {
        self.params
    }
}
