//! Error types for pgviz-core

use thiserror::Error;

/// Main error type for the pgviz-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Plan payload has an unrecognized shape
    #[error("plan shape error: {0}")]
    PlanShape(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Key-value storage error
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for pgviz-core
pub type Result<T> = std::result::Result<T, Error>;
