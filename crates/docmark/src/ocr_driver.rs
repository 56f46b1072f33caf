//! OCR Driver: concurrent or sequential per-page OCR loop.
//!
//! Concurrent mode uses the same `Semaphore` + `JoinSet` + index-written
//! results shape as the teacher's `core::extractor::batch::batch_extract_file`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::completion::normalize_ocr_content;
use crate::core::config::ErrorMode;
use crate::error::{DocMarkError, Result};
use crate::image_utils::{cleanup_image, CleanupOptions};
use crate::image_utils::tesseract_pool::TesseractPool;
use crate::model::{ModelProvider, OcrArgs};
use crate::retry::run_with_retries;
use crate::types::{Credentials, Page};

/// Parameters for a single run of the OCR Driver.
pub struct OcrDriverOptions {
    pub maintain_format: bool,
    pub concurrency: usize,
    pub max_retries: u32,
    pub error_mode: ErrorMode,
    pub cleanup: CleanupOptions,
    pub model: String,
    pub llm_params: serde_json::Value,
    pub prompt: Option<String>,
    pub want_logprobs: bool,
}

/// Tallies of successful/failed OCR calls, plus token totals.
#[derive(Debug, Default)]
pub struct OcrTotals {
    pub successful: usize,
    pub failed: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Runs OCR over every page image in `image_paths`, in page order.
pub async fn run_ocr(
    image_paths: &[PathBuf],
    provider: Arc<dyn ModelProvider>,
    credentials: &Credentials,
    tesseract_pool: Option<Arc<TesseractPool>>,
    options: &OcrDriverOptions,
) -> Result<(Vec<Page>, OcrTotals)> {
    if options.maintain_format {
        run_sequential(image_paths, provider, credentials, tesseract_pool, options).await
    } else {
        run_concurrent(image_paths, provider, credentials, tesseract_pool, options).await
    }
}

async fn ocr_one_page(
    page_number: usize,
    image_path: &PathBuf,
    prior_page: &str,
    provider: &dyn ModelProvider,
    credentials: &Credentials,
    tesseract_pool: Option<&TesseractPool>,
    options: &OcrDriverOptions,
) -> Result<Page> {
    let buffers = cleanup_image(image_path, &options.cleanup, tesseract_pool)?;

    let page_tag = page_number.to_string();
    let args = OcrArgs {
        buffers,
        maintain_format: options.maintain_format,
        prior_page: prior_page.to_string(),
        prompt: options.prompt.clone(),
        model: options.model.clone(),
        llm_params: options.llm_params.clone(),
        want_logprobs: options.want_logprobs,
    };

    let response = run_with_retries(
        || async { provider.ocr(args.clone(), credentials).await },
        options.max_retries,
        &page_tag,
    )
    .await?;

    let content = normalize_ocr_content(&response.content);
    let logprobs = if options.want_logprobs { response.logprobs.clone() } else { None };
    Ok(Page::success(page_number, content, response.input_tokens, response.output_tokens).with_logprobs(logprobs))
}

async fn run_sequential(
    image_paths: &[PathBuf],
    provider: Arc<dyn ModelProvider>,
    credentials: &Credentials,
    tesseract_pool: Option<Arc<TesseractPool>>,
    options: &OcrDriverOptions,
) -> Result<(Vec<Page>, OcrTotals)> {
    let mut pages = Vec::with_capacity(image_paths.len());
    let mut totals = OcrTotals::default();
    let mut prior_page = String::new();

    for (index, image_path) in image_paths.iter().enumerate() {
        let page_number = index + 1;
        match ocr_one_page(
            page_number,
            image_path,
            &prior_page,
            &*provider,
            credentials,
            tesseract_pool.as_deref(),
            options,
        )
        .await
        {
            Ok(page) => {
                totals.successful += 1;
                totals.input_tokens += page.input_tokens.unwrap_or(0);
                totals.output_tokens += page.output_tokens.unwrap_or(0);
                prior_page = page.content.clone();
                pages.push(page);
            }
            Err(error) => {
                totals.failed += 1;
                match options.error_mode {
                    ErrorMode::Throw => return Err(DocMarkError::ocr(Some(page_number), error.to_string())),
                    ErrorMode::Ignore => {
                        pages.push(Page::failed(page_number, error.to_string()));
                        break;
                    }
                }
            }
        }
    }
    Ok((pages, totals))
}

async fn run_concurrent(
    image_paths: &[PathBuf],
    provider: Arc<dyn ModelProvider>,
    credentials: &Credentials,
    tesseract_pool: Option<Arc<TesseractPool>>,
    options: &OcrDriverOptions,
) -> Result<(Vec<Page>, OcrTotals)> {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let input_tokens = Arc::new(AtomicU64::new(0));
    let output_tokens = Arc::new(AtomicU64::new(0));

    for (index, image_path) in image_paths.iter().cloned().enumerate() {
        let page_number = index + 1;
        let provider = Arc::clone(&provider);
        let credentials = credentials.clone();
        let tesseract_pool = tesseract_pool.clone();
        let semaphore = Arc::clone(&semaphore);
        let max_retries = options.max_retries;
        let cleanup = options.cleanup.clone();
        let model = options.model.clone();
        let llm_params = options.llm_params.clone();
        let prompt = options.prompt.clone();
        let want_logprobs = options.want_logprobs;
        let input_tokens = Arc::clone(&input_tokens);
        let output_tokens = Arc::clone(&output_tokens);

        tasks.spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore is never closed");
            let per_page_options = OcrDriverOptions {
                maintain_format: false,
                concurrency: 1,
                max_retries,
                error_mode: ErrorMode::Ignore,
                cleanup,
                model,
                llm_params,
                prompt,
                want_logprobs,
            };
            let result = ocr_one_page(
                page_number,
                &image_path,
                "",
                &*provider,
                &credentials,
                tesseract_pool.as_deref(),
                &per_page_options,
            )
            .await;
            if let Ok(page) = &result {
                input_tokens.fetch_add(page.input_tokens.unwrap_or(0), Ordering::Relaxed);
                output_tokens.fetch_add(page.output_tokens.unwrap_or(0), Ordering::Relaxed);
            }
            (index, result)
        });
    }

    let mut results: Vec<Option<Page>> = vec![None; image_paths.len()];
    let mut totals = OcrTotals::default();

    while let Some(task_result) = tasks.join_next().await {
        match task_result {
            Ok((index, Ok(page))) => {
                totals.successful += 1;
                results[index] = Some(page);
            }
            Ok((index, Err(error))) => {
                totals.failed += 1;
                match options.error_mode {
                    ErrorMode::Throw => return Err(DocMarkError::ocr(Some(index + 1), error.to_string())),
                    ErrorMode::Ignore => results[index] = Some(Page::failed(index + 1, error.to_string())),
                }
            }
            Err(join_error) => {
                return Err(DocMarkError::Other(format!("OCR task panicked: {join_error}")));
            }
        }
    }

    totals.input_tokens = input_tokens.load(Ordering::Relaxed);
    totals.output_tokens = output_tokens.load(Ordering::Relaxed);

    #[allow(clippy::unwrap_used)]
    let pages = results.into_iter().map(|page| page.unwrap()).collect();
    Ok((pages, totals))
}
