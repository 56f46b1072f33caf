//! Extraction input/output types and the final pipeline result.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::page::{LogprobPage, Page};

/// Input handed to a structured-extraction task. The variant selected
/// depends on the pipeline's mode flags (text-only, direct-image, hybrid).
#[derive(Debug, Clone)]
pub enum ExtractionInput {
    TextOnly(String),
    ImagesOnly(Vec<PathBuf>),
    Hybrid { image_paths: Vec<PathBuf>, text: String },
}

/// Counts of successful/failed items for one stage of the pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageSummary {
    pub successful: usize,
    pub failed: usize,
}

/// Summary of the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr: Option<StageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<StageSummary>,
}

/// Logprobs produced during the run, split by stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Logprobs {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ocr: Vec<LogprobPage>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extracted: Vec<LogprobPage>,
}

/// The final result of a `zerox` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub completion_time_ms: u64,
    pub file_name: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub pages: Vec<Page>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Logprobs>,
    pub summary: Summary,
}
