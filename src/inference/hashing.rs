//! Model-free encoder based on signed feature hashing.
//!
//! Words and character trigrams are hashed with SHA-256 into a fixed number of
//! buckets. Texts sharing vocabulary land close together, which is enough to
//! route between a few dozen tool descriptions when no ONNX model is
//! available, and it makes index tests reproducible.

use crate::error::Result;
use crate::inference::encoder::{Embedding, Encoder};
use ndarray::Array1;
use sha2::{Digest, Sha256};

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.35;

#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dim: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Bucket and sign for one feature.
    fn slot(&self, feature: &str) -> (usize, f32) {
        let hash = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&hash[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
        let sign = if hash[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }

    fn accumulate(&self, text: &str) -> Array1<f32> {
        let mut values = Array1::<f32>::zeros(self.dim);

        for word in words(text) {
            let (bucket, sign) = self.slot(&format!("w:{}", word));
            values[bucket] += sign * WORD_WEIGHT;

            let padded: Vec<char> = format!("#{}#", word).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                let (bucket, sign) = self.slot(&format!("t:{}", gram));
                values[bucket] += sign * TRIGRAM_WEIGHT;
            }
        }

        values
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(crate::inference::EMBEDDING_DIM)
    }
}

/// Lowercased alphanumeric runs.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

impl Encoder for HashingEncoder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Embedding> {
        match Embedding::normalized(self.accumulate(text)) {
            Ok(embedding) => Ok(embedding),
            // No usable features (empty or punctuation-only text, or every
            // feature cancelled out): fall back to a one-hot of the raw text.
            Err(_) => {
                let mut values = Array1::<f32>::zeros(self.dim);
                let (bucket, _) = self.slot(&format!("raw:{}", text));
                values[bucket] = 1.0;
                Embedding::normalized(values)
            }
        }
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
