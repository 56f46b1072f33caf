//! Per-page OCR result types.

use serde::{Deserialize, Serialize};

/// Status of a single page's OCR attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageStatus {
    Success,
    Error,
}

/// One page's OCR result.
///
/// Invariant: `status == Success` implies `error` is `None`; `status ==
/// Error` implies `content` is empty and `error` is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page: usize,
    pub content: String,
    pub content_length: usize,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip)]
    pub logprobs: Option<serde_json::Value>,
}

impl Page {
    pub fn success(page: usize, content: String, input_tokens: u64, output_tokens: u64) -> Self {
        let content_length = content.chars().count();
        Self {
            page,
            content,
            content_length,
            status: PageStatus::Success,
            error: None,
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            logprobs: None,
        }
    }

    /// Attaches the per-page logprob payload a provider returned, when the
    /// caller asked for `want_logprobs`.
    pub fn with_logprobs(mut self, logprobs: Option<serde_json::Value>) -> Self {
        self.logprobs = logprobs;
        self
    }

    pub fn failed(page: usize, error: impl Into<String>) -> Self {
        Self {
            page,
            content: String::new(),
            content_length: 0,
            status: PageStatus::Error,
            error: Some(error.into()),
            input_tokens: None,
            output_tokens: None,
            logprobs: None,
        }
    }

    /// Empties a successful page's content, used by the Orchestrator under
    /// `extract_only` once the text has already fed the Extraction Driver.
    pub fn clear_content(&mut self) {
        self.content.clear();
        self.content_length = 0;
    }
}

/// Per-token log probabilities for a single page, or the full document when
/// `page` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogprobPage {
    pub page: Option<usize>,
    pub value: serde_json::Value,
}
