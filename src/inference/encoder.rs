//! Text-to-vector contract shared by every embedding backend.

use crate::error::{AppError, Result};
use ndarray::{Array1, ArrayView1};

/// Embedding width of BAAI/bge-small-en-v1.5, used by every backend.
pub const EMBEDDING_DIM: usize = 384;

/// An L2-normalised embedding vector.
///
/// Construction always normalises, so cosine similarity between two
/// embeddings is their dot product.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Array1<f32>);

impl Embedding {
    /// Normalise `values` to unit length.
    ///
    /// Fails on an all-zero (or non-finite) input, which has no direction.
    pub fn normalized(values: Array1<f32>) -> Result<Self> {
        let norm = values.dot(&values).sqrt();
        if !norm.is_finite() || norm == 0.0 {
            return Err(AppError::ModelError(
                "cannot normalise a zero or non-finite embedding".to_string(),
            ));
        }
        Ok(Self(values / norm))
    }

    pub fn from_vec(values: Vec<f32>) -> Result<Self> {
        Self::normalized(Array1::from(values))
    }

    /// Wrap values that were normalised before being stored.
    ///
    /// The values are kept bit-for-bit; a norm away from 1 means the data is
    /// corrupt.
    pub fn from_stored(values: Vec<f32>) -> Result<Self> {
        let values = Array1::from(values);
        let norm = values.dot(&values).sqrt();
        if !norm.is_finite() || (norm - 1.0).abs() > 1e-3 {
            return Err(AppError::IndexError(format!(
                "stored embedding has norm {}, expected 1",
                norm
            )));
        }
        Ok(Self(values))
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.0.view()
    }

    pub fn as_slice(&self) -> &[f32] {
        // Always built from an owned contiguous Array1
        self.0.as_slice().unwrap_or(&[])
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// `1 - cosine similarity`.
    pub fn cosine_distance(&self, other: &Embedding) -> f32 {
        1.0 - self.0.dot(&other.0)
    }
}

/// Anything that turns text into a unit-length embedding.
///
/// Implementations must be deterministic for the same text and
/// configuration. The index is built and queried with the same encoder.
pub trait Encoder: Send + Sync {
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Embedding>;

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }

    /// Short identifier for logs.
    fn name(&self) -> &str;
}
