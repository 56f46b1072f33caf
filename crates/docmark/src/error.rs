//! Error types for the document pipeline.
//!
//! A single [`DocMarkError`] enum covers every stage of the pipeline, from
//! argument validation through rasterization, OCR, and structured extraction.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocMarkError>;

/// Errors produced by the document pipeline.
#[derive(Debug, Error)]
pub enum DocMarkError {
    /// Invalid or conflicting `PipelineArgs`.
    #[error("config error: {message}")]
    Config { message: String },

    /// The input file could not be read or downloaded.
    #[error("acquisition error: {message}")]
    Acquisition { message: String },

    /// Office/PDF/HEIC conversion to an intermediate format failed.
    #[error("conversion error: {message}")]
    Conversion { message: String },

    /// PDF-to-image rasterization failed.
    #[error("rasterization error: {message}")]
    Rasterization { message: String },

    /// A vision-model OCR call exhausted its retry budget.
    #[error("OCR error{}: {message}", page.map(|p| format!(" (page {p})")).unwrap_or_default())]
    Ocr { page: Option<usize>, message: String },

    /// A structured-extraction call exhausted its retry budget, or the
    /// model's response could not be parsed against the schema.
    #[error("extraction error{}: {message}", page.map(|p| format!(" (page {p})")).unwrap_or_default())]
    Extraction { page: Option<usize>, message: String },

    /// The supplied JSON Schema is not a valid object.
    #[error("schema error: {message}")]
    Schema { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for conditions not otherwise classified, such as a panic
    /// surfacing from a spawned task.
    #[error("{0}")]
    Other(String),
}

impl DocMarkError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::Acquisition { message: message.into() }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion { message: message.into() }
    }

    pub fn rasterization(message: impl Into<String>) -> Self {
        Self::Rasterization { message: message.into() }
    }

    pub fn ocr(page: Option<usize>, message: impl Into<String>) -> Self {
        Self::Ocr { page, message: message.into() }
    }

    pub fn extraction(page: Option<usize>, message: impl Into<String>) -> Self {
        Self::Extraction { page, message: message.into() }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema { message: message.into() }
    }
}
