//! Generation collaborator
//!
//! The text-to-structure service is an opaque, flaky, network-bound call.
//! This module defines the seam (`StructureGenerator`), the Gemini
//! implementation, error classification, and the retrying wrapper that
//! turns a response into a tree.

pub mod gemini;
pub mod retry;

use std::sync::LazyLock;

use async_trait::async_trait;
use mindmap_types::FlatRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::graph::records_from_value;

pub use gemini::GeminiClient;
pub use retry::{ResilientGenerator, RetryPolicy, Sleeper, TokioSleeper};

/// Network-outage vocabulary marking a failure as retry-worthy
static TRANSIENT_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(unavailable|network|time[d]?\s?out|aborted|econnreset|connection reset",
        r"|socket|closed|broken pipe|refused|fetch failed)",
    ))
    .unwrap()
});

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").unwrap());

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Generation service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Never written back out
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            temperature: Some(0.2),
            max_output_tokens: Some(8192),
            timeout_seconds: 60,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Collaborator-level failure
#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Authentication failed - check API key")]
    AuthenticationError,

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid node records: {0}")]
    Validation(#[from] ValidationError),

    /// Failure reported by a collaborator as a bare message
    #[error("{0}")]
    Service(String),
}

impl AiError {
    /// Transient failures are retried; everything else aborts immediately
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::AuthenticationError
            | AiError::QuotaExceeded(_)
            | AiError::JsonError(_)
            | AiError::InvalidResponse(_)
            | AiError::Validation(_) => false,
            // a request error covers the peer dropping the connection
            AiError::HttpError(e) if e.is_timeout() || e.is_connect() || e.is_request() => true,
            AiError::HttpError(e) if e.is_body() => true,
            other => TRANSIENT_VOCABULARY.is_match(&other.to_string()),
        }
    }
}

/// Result type alias for generation calls
pub type AiResult<T> = Result<T, AiError>;

// =============================================================================
// COLLABORATOR SEAM
// =============================================================================

/// Text-to-structure service returning the raw flat-record response body
#[async_trait]
pub trait StructureGenerator: Send + Sync {
    async fn generate(&self, document_text: &str) -> AiResult<String>;

    /// Name for logs
    fn name(&self) -> &str {
        "generator"
    }
}

/// Instruction sent with every document
pub fn build_prompt(document_text: &str) -> String {
    format!(
        r#"You are an expert at organising information into mind maps.

Read the document below and produce a hierarchical mind map of its key ideas.

RESPONSE FORMAT - Respond ONLY with a JSON array of flat node records:
[
  {{"id": "1", "parentId": "", "topic": "Main subject", "content": "One or two sentence summary"}},
  {{"id": "2", "parentId": "1", "topic": "Sub-topic", "content": "Details"}}
]

RULES:
- Exactly one record has an empty parentId: the central topic
- Every other parentId is the id of another record
- Ids are unique
- Keep topics short; put detail in content

DOCUMENT:
{document_text}"#
    )
}

/// Strip a surrounding markdown code fence, if any
pub fn clean_json_response(raw: &str) -> &str {
    match CODE_FENCE.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}

/// Parse a raw response body as a flat record list
pub fn parse_flat_records(raw: &str) -> AiResult<Vec<FlatRecord>> {
    let value: serde_json::Value = serde_json::from_str(clean_json_response(raw))?;
    Ok(records_from_value(&value)?)
}
