//! Extraction Driver: builds per-page and full-document extraction inputs,
//! dispatches them concurrently, and merges the results.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::completion::normalize_extraction_content;
use crate::error::{DocMarkError, Result};
use crate::model::{ExtractionArgs, ModelProvider};
use crate::retry::run_with_retries;
use crate::schema::SplitSchema;
use crate::types::{Credentials, ExtractionInput, LogprobPage, Page, StageSummary};

/// How extraction inputs are constructed from OCR'd pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    TextOnly,
    DirectImage,
    Hybrid,
}

pub struct ExtractionDriverOptions {
    pub mode: ExtractionMode,
    pub concurrency: usize,
    pub max_retries: u32,
    pub model: String,
    pub llm_params: serde_json::Value,
    pub prompt: Option<String>,
    pub want_logprobs: bool,
}

/// Tallies of successful/failed extraction calls, plus token totals and any
/// collected logprob payloads, the same shape as `ocr_driver::OcrTotals`.
#[derive(Debug, Default)]
pub struct ExtractionTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub logprobs: Vec<LogprobPage>,
}

/// One extraction task's outcome: the per-page tag it ran under (`None` for
/// the full-document task) plus the parsed JSON value.
struct ExtractionOutcome {
    page: Option<usize>,
    value: serde_json::Value,
    input_tokens: u64,
    output_tokens: u64,
    logprobs: Option<serde_json::Value>,
}

/// Runs the Extraction Driver over `split` using `pages`' content (or
/// `image_paths`, depending on `options.mode`), merging per-page values under
/// their property name and full-document values as bare replacements.
pub async fn run_extraction(
    split: &SplitSchema,
    pages: &[Page],
    image_paths: &[std::path::PathBuf],
    provider: Arc<dyn ModelProvider>,
    credentials: &Credentials,
    options: &ExtractionDriverOptions,
) -> Result<(serde_json::Value, StageSummary, ExtractionTotals)> {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks: JoinSet<Result<ExtractionOutcome>> = JoinSet::new();

    if let Some(per_page_schema) = &split.per_page_schema {
        for (index, page) in pages.iter().enumerate() {
            let page_number = page.page;
            let own_image = image_paths.get(index).cloned().into_iter().collect::<Vec<_>>();
            let input = build_input(options.mode, std::slice::from_ref(page), &own_image);
            spawn_task(&mut tasks, &semaphore, provider.clone(), credentials.clone(), options, per_page_schema.clone(), input, Some(page_number));
        }
    }

    if let Some(full_doc_schema) = &split.full_doc_schema {
        let input = build_full_doc_input(options.mode, pages, image_paths);
        spawn_task(&mut tasks, &semaphore, provider.clone(), credentials.clone(), options, full_doc_schema.clone(), input, None);
    }

    let mut per_page_values: std::collections::BTreeMap<String, Vec<serde_json::Value>> = Default::default();
    let mut full_doc_object: Option<serde_json::Map<String, serde_json::Value>> = None;
    let mut summary = StageSummary::default();
    let mut totals = ExtractionTotals::default();

    while let Some(task_result) = tasks.join_next().await {
        match task_result {
            Ok(Ok(outcome)) => {
                summary.successful += 1;
                totals.input_tokens += outcome.input_tokens;
                totals.output_tokens += outcome.output_tokens;
                if let Some(value) = outcome.logprobs.clone() {
                    totals.logprobs.push(LogprobPage { page: outcome.page, value });
                }
                merge_outcome(outcome, &mut per_page_values, &mut full_doc_object);
            }
            Ok(Err(_)) => summary.failed += 1,
            Err(join_error) => return Err(DocMarkError::Other(format!("extraction task panicked: {join_error}"))),
        }
    }

    let mut merged = full_doc_object.unwrap_or_default();
    for (key, values) in per_page_values {
        merged.insert(key, serde_json::Value::Array(values));
    }
    Ok((serde_json::Value::Object(merged), summary, totals))
}

fn merge_outcome(
    outcome: ExtractionOutcome,
    per_page_values: &mut std::collections::BTreeMap<String, Vec<serde_json::Value>>,
    full_doc_object: &mut Option<serde_json::Map<String, serde_json::Value>>,
) {
    match outcome.page {
        Some(page_number) => {
            if let Some(object) = outcome.value.as_object() {
                for (key, value) in object {
                    if value.is_null() {
                        continue;
                    }
                    per_page_values
                        .entry(key.clone())
                        .or_default()
                        .push(serde_json::json!({ "page": page_number, "value": value }));
                }
            }
        }
        None => {
            if let Some(object) = outcome.value.as_object() {
                full_doc_object.get_or_insert_with(Default::default).extend(object.clone());
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_task(
    tasks: &mut JoinSet<Result<ExtractionOutcome>>,
    semaphore: &Arc<Semaphore>,
    provider: Arc<dyn ModelProvider>,
    credentials: Credentials,
    options: &ExtractionDriverOptions,
    schema: serde_json::Value,
    input: ExtractionInput,
    page: Option<usize>,
) {
    let semaphore = Arc::clone(semaphore);
    let max_retries = options.max_retries;
    let model = options.model.clone();
    let llm_params = options.llm_params.clone();
    let prompt = options.prompt.clone();
    let want_logprobs = options.want_logprobs;
    let tag = page.map(|p| p.to_string()).unwrap_or_else(|| "full-document".to_string());

    tasks.spawn(async move {
        let _permit = semaphore.acquire().await.expect("semaphore is never closed");
        let args = ExtractionArgs { input, prompt, schema, model, llm_params, want_logprobs };
        let response = run_with_retries(
            || async { provider.extract(args.clone(), &credentials).await },
            max_retries,
            &tag,
        )
        .await
        .map_err(|e| DocMarkError::extraction(page, e.to_string()))?;
        let input_tokens = response.input_tokens;
        let output_tokens = response.output_tokens;
        let logprobs = if want_logprobs { response.logprobs.clone() } else { None };
        let value = normalize_extraction_content(&response)?;
        Ok(ExtractionOutcome { page, value, input_tokens, output_tokens, logprobs })
    });
}

fn build_input(mode: ExtractionMode, pages: &[Page], image_paths: &[std::path::PathBuf]) -> ExtractionInput {
    match mode {
        ExtractionMode::TextOnly => {
            ExtractionInput::TextOnly(pages.iter().map(|p| p.content.clone()).collect::<Vec<_>>().join("\n<hr><hr>\n"))
        }
        ExtractionMode::DirectImage => ExtractionInput::ImagesOnly(image_paths.to_vec()),
        ExtractionMode::Hybrid => ExtractionInput::Hybrid {
            image_paths: image_paths.to_vec(),
            text: pages.iter().map(|p| p.content.clone()).collect::<Vec<_>>().join("\n<hr><hr>\n"),
        },
    }
}

fn build_full_doc_input(mode: ExtractionMode, pages: &[Page], image_paths: &[std::path::PathBuf]) -> ExtractionInput {
    build_input(mode, pages, image_paths)
}

