//! Bi-encoder model for semantic tool matching.
//!
//! Uses BAAI/bge-small-en-v1.5 exported to ONNX to produce 384-dimensional
//! embeddings. Tool descriptions and queries are encoded independently, so
//! tool vectors are computed once at index build time.

use crate::error::{AppError, Result};
use crate::inference::encoder::{Embedding, Encoder};
use ndarray::Array1;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;

/// How token states are reduced to a single sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pooling {
    /// First token (`[CLS]`). What BGE models are trained with.
    Cls,
    /// Attention-masked mean over all tokens.
    Mean,
}

impl Pooling {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "cls" => Some(Self::Cls),
            "mean" => Some(Self::Mean),
            _ => None,
        }
    }
}

/// ONNX bi-encoder.
///
/// `Session::run` needs `&mut self`; queries are handled one at a time, so a
/// single session behind a mutex is enough.
pub struct BiEncoderModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    embedding_dim: usize,
    pooling: Pooling,
}

impl BiEncoderModel {
    /// Load bi-encoder model and tokenizer.
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `tokenizer_path` - Path to the tokenizer JSON file
    /// * `max_length` - Maximum sequence length (512 for BGE-small)
    /// * `embedding_dim` - Hidden size the model is expected to produce
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        max_length: usize,
        embedding_dim: usize,
        pooling: Pooling,
    ) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
            AppError::TokenizationError(format!("Failed to load bi-encoder tokenizer: {}", e))
        })?;

        let session = Session::builder()
            .map_err(|e| AppError::ModelError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::ModelError(e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e| AppError::ModelError(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| AppError::ModelError(format!("Failed to load bi-encoder model: {}", e)))?;

        tracing::info!(
            model = %model_path.display(),
            tokenizer = %tokenizer_path.display(),
            max_length,
            ?pooling,
            "Bi-encoder model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length,
            embedding_dim,
            pooling,
        })
    }

    /// Encode a batch of texts into normalised embeddings.
    fn run_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| AppError::TokenizationError(e.to_string()))?;

        let batch_size = encodings.len();

        // Longest sequence in this batch, capped at max_length
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len().min(self.max_length))
            .max()
            .unwrap_or(1)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            for j in 0..len {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
            }
        }

        let shape = [batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e| AppError::ModelError(e.to_string()))?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask.clone()))
            .map_err(|e| AppError::ModelError(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
            .map_err(|e| AppError::ModelError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AppError::ModelError("Bi-encoder session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            ])
            .map_err(|e| AppError::ModelError(format!("Bi-encoder inference failed: {}", e)))?;

        // last_hidden_state: (batch, seq_len, hidden_size)
        let hidden_state = outputs
            .get("last_hidden_state")
            .ok_or_else(|| AppError::ModelError("No 'last_hidden_state' output found".to_string()))?;

        let (shape_info, data) = hidden_state
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::ModelError(e.to_string()))?;

        let hidden_size = shape_info[2] as usize;
        if hidden_size != self.embedding_dim {
            return Err(AppError::ModelError(format!(
                "Model produced {}-dim states, expected {}",
                hidden_size, self.embedding_dim
            )));
        }

        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let row_base = i * max_len * hidden_size;
            let pooled = match self.pooling {
                Pooling::Cls => Array1::from(data[row_base..row_base + hidden_size].to_vec()),
                Pooling::Mean => {
                    let mut sum = Array1::<f32>::zeros(hidden_size);
                    let mut count = 0.0f32;
                    for j in 0..max_len {
                        if attention_mask[i * max_len + j] == 1 {
                            let base = row_base + j * hidden_size;
                            for (k, v) in sum.iter_mut().enumerate() {
                                *v += data[base + k];
                            }
                            count += 1.0;
                        }
                    }
                    if count > 0.0 {
                        sum /= count;
                    }
                    sum
                }
            };
            embeddings.push(Embedding::normalized(pooled)?);
        }

        Ok(embeddings)
    }
}

impl Encoder for BiEncoderModel {
    fn dimension(&self) -> usize {
        self.embedding_dim
    }

    fn encode(&self, text: &str) -> Result<Embedding> {
        self.run_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| AppError::ModelError("Bi-encoder returned no embedding".to_string()))
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.run_batch(texts)
    }

    fn name(&self) -> &str {
        "onnx-bge"
    }
}
