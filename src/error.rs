use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Risposta engine
#[derive(Error, Debug)]
pub enum RispostaError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Query rejected before retrieval
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Document store errors (backend unavailable is fatal for the query)
    #[error("Document store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Sparse index load/build errors
    #[error("Sparse index error: {0}")]
    SparseIndex(#[from] crate::sparse::SparseIndexError),

    /// Embedding oracle errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    /// Generation backend errors (single-draft mode only; multi-draft
    /// failures are recorded per draft and never abort the batch)
    #[error("Generation error: {0}")]
    Generation(#[from] crate::generation::GenerationError),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Risposta operations
pub type Result<T> = std::result::Result<T, RispostaError>;
