//! Brute-force cosine search. Reference for the HNSW graph and the fallback
//! for small catalogs.

use ndarray::{Array2, ArrayView1};

/// Distances from `query` to every row of `matrix`, ranked ascending.
///
/// Rows are assumed L2-normalised, so cosine distance is `1 - dot`. The sort
/// is stable, so equal distances keep row order.
pub fn rank(matrix: &Array2<f32>, query: ArrayView1<'_, f32>, k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = matrix
        .outer_iter()
        .map(|row| 1.0 - row.dot(&query))
        .enumerate()
        .collect();

    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
