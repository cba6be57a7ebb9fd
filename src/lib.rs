//! Dynatool - semantic routing of free-text queries to tools
//!
//! This library exposes the pieces of an interactive tool-selection session:
//! catalog ingestion, embedding, vector search, argument resolution and the
//! operator console, so they can be tested and embedded independently.

pub mod config;
pub mod console;
pub mod error;
pub mod index;
pub mod inference;
pub mod ingestion;
pub mod persistence;
pub mod registry;
pub mod resolve;
pub mod routing;
pub mod server;
pub mod session;

// Re-export key types for convenience
pub use config::{Config, EncoderKind};
pub use error::{AppError, Result};
pub use index::{Candidate, SearchMode, VectorIndex};
pub use inference::{Embedding, Encoder};
pub use ingestion::{atomize_tools, ParameterKind, ParameterSpec, ToolDescriptor};
pub use registry::ToolRegistry;
pub use resolve::{extract_numbers, ResolvedArgs, ResolverTable};
pub use routing::{QueryRouter, Route};
pub use server::{Arguments, BuiltinServer, ToolServer};
pub use session::{PreparedCall, Session};
