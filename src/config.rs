use crate::error::{AppError, Result};
use crate::index::{HnswParams, SearchMode};
use crate::inference::{BiEncoderModel, Encoder, HashingEncoder, Pooling, EMBEDDING_DIM};
use crate::routing::DEFAULT_TOP_K;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Which embedding backend the session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    /// ONNX bi-encoder when the model files exist, hashing otherwise.
    Auto,
    /// ONNX bi-encoder; missing model files are a startup error.
    Onnx,
    /// Model-free hashing encoder.
    Hashing,
}

impl EncoderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "" | "auto" => Some(Self::Auto),
            "onnx" | "bge" | "bi-encoder" => Some(Self::Onnx),
            "hashing" | "hash" => Some(Self::Hashing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Single-file index store, deleted and rewritten every session.
    pub index_path: PathBuf,
    pub encoder: EncoderKind,
    /// Path to bi-encoder ONNX model (BAAI/bge-small-en-v1.5).
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub max_sequence_length: usize,
    pub pooling: Pooling,
    /// Candidates fetched per query; rank 1 is invoked.
    pub top_k: usize,
    pub search_mode: SearchMode,
    pub hnsw: HnswParams,
    /// Reject routes whose best distance exceeds this. `None` always routes.
    pub max_distance: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(".dynatool/tools.idx"),
            encoder: EncoderKind::Auto,
            model_path: PathBuf::from("./models/bge-small-en-v1.5/model.onnx"),
            tokenizer_path: PathBuf::from("./models/bge-small-en-v1.5/tokenizer.json"),
            max_sequence_length: 512,
            pooling: Pooling::Cls,
            top_k: DEFAULT_TOP_K,
            search_mode: SearchMode::Hnsw,
            hnsw: HnswParams::default(),
            max_distance: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let hnsw_defaults = HnswParams::default();

        let encoder = match lookup("ENCODER") {
            Some(value) => EncoderKind::parse(&value)
                .ok_or_else(|| anyhow::anyhow!("Unknown ENCODER '{}'", value))?,
            None => defaults.encoder,
        };
        let pooling = match lookup("POOLING") {
            Some(value) => {
                Pooling::parse(&value).ok_or_else(|| anyhow::anyhow!("Unknown POOLING '{}'", value))?
            }
            None => defaults.pooling,
        };
        let search_mode = match lookup("SEARCH_MODE") {
            Some(value) => SearchMode::parse(&value)
                .ok_or_else(|| anyhow::anyhow!("Unknown SEARCH_MODE '{}'", value))?,
            None => defaults.search_mode,
        };

        let top_k: usize = lookup("TOP_K")
            .unwrap_or_else(|| defaults.top_k.to_string())
            .parse()?;
        if top_k == 0 {
            anyhow::bail!("TOP_K must be at least 1");
        }

        let hnsw = HnswParams {
            max_connections: lookup("HNSW_M")
                .unwrap_or_else(|| hnsw_defaults.max_connections.to_string())
                .parse()?,
            ef_construction: lookup("EF_CONSTRUCTION")
                .unwrap_or_else(|| hnsw_defaults.ef_construction.to_string())
                .parse()?,
            ef_search: lookup("EF_SEARCH")
                .unwrap_or_else(|| hnsw_defaults.ef_search.to_string())
                .parse()?,
        };
        if hnsw.max_connections < 2 {
            anyhow::bail!("HNSW_M must be at least 2");
        }
        if hnsw.ef_construction == 0 || hnsw.ef_search == 0 {
            anyhow::bail!("EF_CONSTRUCTION and EF_SEARCH must be at least 1");
        }

        Ok(Self {
            index_path: lookup("INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            encoder,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            tokenizer_path: lookup("TOKENIZER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tokenizer_path),
            max_sequence_length: lookup("MAX_SEQ_LENGTH")
                .unwrap_or_else(|| defaults.max_sequence_length.to_string())
                .parse()?,
            pooling,
            top_k,
            search_mode,
            hnsw,
            max_distance: lookup("MAX_DISTANCE").map(|s| s.parse::<f32>()).transpose()?,
        })
    }

    fn model_files_present(&self) -> bool {
        self.model_path.exists() && self.tokenizer_path.exists()
    }

    /// Construct the configured encoder.
    ///
    /// `Auto` falls back to the hashing encoder when the model files are
    /// missing; `Onnx` treats that as an error.
    pub fn build_encoder(&self) -> Result<Arc<dyn Encoder>> {
        let use_onnx = match self.encoder {
            EncoderKind::Hashing => false,
            EncoderKind::Onnx => true,
            EncoderKind::Auto => {
                if !self.model_files_present() {
                    tracing::warn!(
                        model = %self.model_path.display(),
                        tokenizer = %self.tokenizer_path.display(),
                        "Bi-encoder model not found, using hashing encoder"
                    );
                }
                self.model_files_present()
            }
        };

        if !use_onnx {
            return Ok(Arc::new(HashingEncoder::new(EMBEDDING_DIM)));
        }

        if !self.model_files_present() {
            return Err(AppError::ModelError(format!(
                "Bi-encoder model files not found: {} / {}",
                self.model_path.display(),
                self.tokenizer_path.display()
            )));
        }

        let model = BiEncoderModel::load(
            &self.model_path,
            &self.tokenizer_path,
            self.max_sequence_length,
            EMBEDDING_DIM,
            self.pooling,
        )?;
        Ok(Arc::new(model))
    }
}
