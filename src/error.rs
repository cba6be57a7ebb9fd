use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The tool-serving collaborator could not be reached or returned an
    /// unusable catalog. Fatal at startup.
    #[error("Tool registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Model inference failed: {0}")]
    ModelError(String),

    #[error("Tokenization failed: {0}")]
    TokenizationError(String),

    #[error("Vector index error: {0}")]
    IndexError(String),

    #[error("Malformed tool definition: {0}")]
    AtomizerError(String),

    /// Only produced when a routing distance threshold is configured.
    #[error("No tool matched closely enough (best: {name}, distance {distance:.4})")]
    NoConfidentMatch { name: String, distance: f32 },
}

impl From<ort::Error> for AppError {
    fn from(err: ort::Error) -> Self {
        AppError::ModelError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IndexError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
