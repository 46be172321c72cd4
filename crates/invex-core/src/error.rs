//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Pattern store error.
    #[error("pattern store error: {0}")]
    Store(#[from] StoreError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by an external pattern store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or read.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be understood.
    #[error("malformed record {record}: {reason}")]
    Malformed { record: String, reason: String },
}

/// Errors related to invoice field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The document produced no usable text.
    #[error("no text found in document")]
    NoText,

    /// The upstream decoder could not turn the document into text.
    #[error("{0}")]
    Decode(String),

    /// The table reconstructor hit its row ceiling.
    #[error("table reconstruction produced {found} rows (limit {limit})")]
    TooManyItems { found: usize, limit: usize },

    /// A pipeline stage failed unexpectedly.
    #[error("pipeline failure: {0}")]
    Pipeline(String),
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
