//! Error handling for the mind map pipeline
//!
//! Library errors use thiserror. `MindMapError` is the user-facing taxonomy:
//! every action surfaces at most one of these.

use thiserror::Error;

use crate::extract::ExtractError;

/// Main error type for the pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MindMapError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Network-class failure that survived every retry
    #[error("Service unreachable after {attempts} attempt(s): {message}")]
    TransientService { attempts: u32, message: String },

    /// Authentication, quota, schema or parse failure; never retried
    #[error("Generation failed: {message}")]
    PermanentService { message: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read {path}: {message}")]
    ReadFailure { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MindMapError {
    /// The single message shown to the user for a failed action
    pub fn user_message(&self) -> String {
        match self {
            MindMapError::Validation(e) => format!("The generated structure is invalid: {e}"),
            MindMapError::TransientService { .. } => {
                "The generation service is unreachable. Check your connection and try again."
                    .to_string()
            }
            MindMapError::PermanentService { message } => {
                format!("Mind map generation failed: {message}")
            }
            MindMapError::UnsupportedFormat(ext) => {
                format!("Files of type '{ext}' are not supported.")
            }
            MindMapError::ReadFailure { path, .. } => format!("Could not read '{path}'."),
            MindMapError::Config(message) => format!("Invalid configuration: {message}"),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, MindMapError::TransientService { .. })
    }
}

impl From<ExtractError> for MindMapError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::UnsupportedFormat { extension } => {
                MindMapError::UnsupportedFormat(extension)
            }
            ExtractError::ReadFailure { path, source } => MindMapError::ReadFailure {
                path: path.display().to_string(),
                message: source.to_string(),
            },
        }
    }
}

/// Structurally invalid tree-builder input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Expected an array of node records")]
    NotAnArray,

    #[error("Record {index} is not an object")]
    NotAnObject { index: usize },

    #[error("Record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Record {index} has an empty id")]
    EmptyId { index: usize },
}

/// Result type alias for pipeline operations
pub type MindMapResult<T> = Result<T, MindMapError>;
