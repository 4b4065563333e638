//! Error types for the docai-core library.

use thiserror::Error;

use crate::models::invoice::Producer;

/// Main error type for the docai library.
#[derive(Error, Debug)]
pub enum DocaiError {
    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning producer output into canonical fields.
///
/// These never abort a run. The pipeline stores their message on the
/// affected [`ExtractionRecord`](crate::models::invoice::ExtractionRecord).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The response text has no `{ ... }` span at all.
    #[error("no JSON object found in response")]
    NoJsonObject,

    /// The `{ ... }` span was found but could not be decoded.
    #[error("could not parse JSON from response: {reason}")]
    StructuredResponseUnparseable { reason: String },

    /// Neither producer yielded anything for the document.
    #[error("no producer output for document")]
    NoProducerOutput,

    /// The producer itself failed before yielding any output.
    #[error("{producer} failed: {message}")]
    Producer { producer: Producer, message: String },
}

/// Result type for the docai library.
pub type Result<T> = std::result::Result<T, DocaiError>;
