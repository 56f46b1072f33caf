//! Scenario tests for the document pipeline, exercised against
//! `FakeModelProvider`/custom OCR functions rather than live provider
//! endpoints.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use serde_json::json;

use docmark::core::config::{ErrorMode, PageSpec, PipelineArgs};
use docmark::extraction_driver::{run_extraction, ExtractionDriverOptions, ExtractionMode};
use docmark::image_utils::CleanupOptions;
use docmark::model::{CompletionResponse, ExtractionArgs, ModelProvider, OcrArgs};
use docmark::ocr_driver::{run_ocr, OcrDriverOptions};
use docmark::schema::split_schema;
use docmark::types::{Credentials, Page, PageStatus};
use docmark::{zerox, DocMarkError};

fn write_square_png(dir: &std::path::Path, name: &str, side: u32) -> PathBuf {
    let path = dir.join(name);
    let image = RgbImage::from_pixel(side, side, Rgb([10, 20, 30]));
    image.save(&path).expect("test fixture PNG must encode");
    path
}

fn api_key_credentials() -> Credentials {
    Credentials::ApiKey { api_key: "test-key".to_string(), endpoint: None }
}

fn no_cleanup_options() -> CleanupOptions {
    CleanupOptions { correct_orientation: false, trim_edges: false, max_image_size_bytes: 0 }
}

fn driver_options(error_mode: ErrorMode, concurrency: usize) -> OcrDriverOptions {
    OcrDriverOptions {
        maintain_format: false,
        concurrency,
        max_retries: 0,
        error_mode,
        cleanup: no_cleanup_options(),
        model: "gpt-4o".to_string(),
        llm_params: json!({}),
        prompt: None,
        want_logprobs: false,
    }
}

/// An OCR/extraction double that resolves based on the decoded width of the
/// first image buffer it's handed, so results can be tied back to a
/// specific source file regardless of which order calls actually complete.
struct FakeModelProvider {
    delay_by_width: HashMap<u32, u64>,
    fail_widths: Vec<u32>,
    prior_pages_seen: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl FakeModelProvider {
    fn new(delay_by_width: HashMap<u32, u64>) -> Self {
        Self { delay_by_width, fail_widths: Vec::new(), prior_pages_seen: Mutex::new(Vec::new()), call_count: AtomicUsize::new(0) }
    }

    fn failing_on(mut self, widths: Vec<u32>) -> Self {
        self.fail_widths = widths;
        self
    }
}

#[async_trait]
impl ModelProvider for FakeModelProvider {
    async fn ocr(&self, args: OcrArgs, _credentials: &Credentials) -> docmark::Result<CompletionResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prior_pages_seen.lock().unwrap().push(args.prior_page.clone());

        let decoded = image::load_from_memory(&args.buffers[0]).expect("fake provider expects a decodable PNG");
        let width = decoded.width();

        if self.fail_widths.contains(&width) {
            return Err(DocMarkError::Other(format!("simulated OCR failure for width {width}")));
        }

        if let Some(delay) = self.delay_by_width.get(&width) {
            tokio::time::sleep(std::time::Duration::from_millis(*delay)).await;
        }

        Ok(CompletionResponse {
            content: format!("```markdown\n# page-width-{width}\n```"),
            input_tokens: width as u64,
            output_tokens: 1,
            logprobs: None,
        })
    }

    async fn extract(&self, args: ExtractionArgs, _credentials: &Credentials) -> docmark::Result<CompletionResponse> {
        let properties = args.schema["properties"].as_object().cloned().unwrap_or_default();
        let content = if properties.contains_key("page_title") {
            let text = match &args.input {
                docmark::types::ExtractionInput::TextOnly(text) => text.clone(),
                _ => String::new(),
            };
            json!({ "page_title": format!("title for: {text}") })
        } else {
            json!({ "document_summary": "two-page summary" })
        };
        Ok(CompletionResponse { content: content.to_string(), input_tokens: 1, output_tokens: 1, logprobs: None })
    }
}

#[tokio::test]
async fn concurrent_ocr_preserves_page_order_despite_reordered_completion() {
    let dir = tempfile::tempdir().unwrap();
    // Page 1 is the widest image and is made to finish last; page order in
    // the result must still match page position, not completion order.
    let image_paths = vec![
        write_square_png(dir.path(), "page1.png", 12),
        write_square_png(dir.path(), "page2.png", 8),
        write_square_png(dir.path(), "page3.png", 4),
    ];

    let mut delays = HashMap::new();
    delays.insert(12, 30);
    delays.insert(8, 15);
    delays.insert(4, 0);
    let provider: Arc<dyn ModelProvider> = Arc::new(FakeModelProvider::new(delays));

    let options = driver_options(ErrorMode::Ignore, 3);
    let (pages, totals) = run_ocr(&image_paths, provider, &api_key_credentials(), None, &options).await.unwrap();

    assert_eq!(pages.len(), 3);
    for (index, page) in pages.iter().enumerate() {
        assert_eq!(page.page, index + 1, "page numbers must track position, not completion order");
        assert_eq!(page.status, PageStatus::Success);
        assert_eq!(page.content_length, page.content.chars().count());
    }
    assert!(pages[0].content.contains("page-width-12"));
    assert!(pages[1].content.contains("page-width-8"));
    assert!(pages[2].content.contains("page-width-4"));

    assert_eq!(totals.successful, 3);
    assert_eq!(totals.failed, 0);
    let expected_tokens: u64 = [12u64, 8, 4].iter().sum();
    assert_eq!(totals.input_tokens, expected_tokens);
}

#[tokio::test]
async fn concurrent_ocr_ignore_mode_records_failure_but_keeps_other_pages() {
    let dir = tempfile::tempdir().unwrap();
    let image_paths =
        vec![write_square_png(dir.path(), "ok1.png", 6), write_square_png(dir.path(), "bad.png", 9), write_square_png(dir.path(), "ok2.png", 6)];

    let provider: Arc<dyn ModelProvider> = Arc::new(FakeModelProvider::new(HashMap::new()).failing_on(vec![9]));
    let options = driver_options(ErrorMode::Ignore, 3);
    let (pages, totals) = run_ocr(&image_paths, provider, &api_key_credentials(), None, &options).await.unwrap();

    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].status, PageStatus::Success);
    assert_eq!(pages[1].status, PageStatus::Error);
    assert!(pages[1].error.is_some());
    assert_eq!(pages[1].content, "");
    assert_eq!(pages[2].status, PageStatus::Success);
    assert_eq!(totals.successful, 2);
    assert_eq!(totals.failed, 1);
}

#[tokio::test]
async fn sequential_maintain_format_halts_after_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let image_paths = vec![
        write_square_png(dir.path(), "ok.png", 5),
        write_square_png(dir.path(), "bad.png", 9),
        write_square_png(dir.path(), "never-reached.png", 5),
    ];

    let provider: Arc<dyn ModelProvider> = Arc::new(FakeModelProvider::new(HashMap::new()).failing_on(vec![9]));
    let mut options = driver_options(ErrorMode::Ignore, 1);
    options.maintain_format = true;
    let (pages, totals) = run_ocr(&image_paths, provider, &api_key_credentials(), None, &options).await.unwrap();

    // maintain_format is sequential: a failure under Ignore halts further
    // OCR rather than skipping ahead to remaining pages.
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].status, PageStatus::Success);
    assert_eq!(pages[1].status, PageStatus::Error);
    assert_eq!(totals.successful, 1);
    assert_eq!(totals.failed, 1);
}

#[tokio::test]
async fn sequential_maintain_format_threads_prior_page_into_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let image_paths = vec![write_square_png(dir.path(), "p1.png", 6), write_square_png(dir.path(), "p2.png", 6)];

    let concrete_provider = Arc::new(FakeModelProvider::new(HashMap::new()));
    let provider: Arc<dyn ModelProvider> = concrete_provider.clone();
    let mut options = driver_options(ErrorMode::Ignore, 1);
    options.maintain_format = true;

    let (pages, _totals) = run_ocr(&image_paths, provider, &api_key_credentials(), None, &options).await.unwrap();
    assert_eq!(pages.len(), 2);

    let seen = concrete_provider.prior_pages_seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], "", "first call has no prior page yet");
    assert_eq!(seen[1], pages[0].content, "second call must see the first page's content verbatim");
}

#[tokio::test]
async fn extraction_driver_merges_per_page_and_full_document_properties() {
    let schema = json!({
        "type": "object",
        "properties": {
            "page_title": {"type": "string"},
            "document_summary": {"type": "string"},
        },
        "required": ["page_title", "document_summary"],
    });
    let split = split_schema(&schema, &["page_title".to_string()]).unwrap();
    assert!(split.per_page_schema.is_some());
    assert!(split.full_doc_schema.is_some());

    let pages = vec![Page::success(1, "First page body".to_string(), 1, 1), Page::success(2, "Second page body".to_string(), 1, 1)];
    let provider: Arc<dyn ModelProvider> = Arc::new(FakeModelProvider::new(HashMap::new()));
    let options = ExtractionDriverOptions {
        mode: ExtractionMode::TextOnly,
        concurrency: 2,
        max_retries: 0,
        model: "gpt-4o".to_string(),
        llm_params: json!({}),
        prompt: None,
        want_logprobs: false,
    };

    let (value, summary, totals) =
        run_extraction(&split, &pages, &[], provider, &api_key_credentials(), &options).await.unwrap();
    assert_eq!(totals.input_tokens, 3); // three successful extraction calls at 1 token each

    assert_eq!(summary.successful, 3); // two per-page tasks + one full-doc task
    assert_eq!(summary.failed, 0);
    assert_eq!(value["document_summary"], json!("two-page summary"));
    let titles = value["page_title"].as_array().unwrap();
    assert_eq!(titles.len(), 2);
    let pages_seen: Vec<u64> = titles.iter().map(|entry| entry["page"].as_u64().unwrap()).collect();
    assert!(pages_seen.contains(&1));
    assert!(pages_seen.contains(&2));
}

#[tokio::test]
async fn sequential_throw_mode_propagates_ocr_error() {
    let dir = tempfile::tempdir().unwrap();
    let image_paths = vec![write_square_png(dir.path(), "ok.png", 5), write_square_png(dir.path(), "bad.png", 9)];

    let provider: Arc<dyn ModelProvider> = Arc::new(FakeModelProvider::new(HashMap::new()).failing_on(vec![9]));
    let mut options = driver_options(ErrorMode::Throw, 1);
    options.maintain_format = true;

    let error = run_ocr(&image_paths, provider, &api_key_credentials(), None, &options).await.unwrap_err();
    match error {
        DocMarkError::Ocr { page, .. } => assert_eq!(page, Some(2)),
        other => panic!("expected DocMarkError::Ocr, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_throw_mode_propagates_ocr_error() {
    let dir = tempfile::tempdir().unwrap();
    let image_paths =
        vec![write_square_png(dir.path(), "ok.png", 5), write_square_png(dir.path(), "bad.png", 9), write_square_png(dir.path(), "ok2.png", 5)];

    let provider: Arc<dyn ModelProvider> = Arc::new(FakeModelProvider::new(HashMap::new()).failing_on(vec![9]));
    let options = driver_options(ErrorMode::Throw, 3);

    let error = run_ocr(&image_paths, provider, &api_key_credentials(), None, &options).await.unwrap_err();
    assert!(matches!(error, DocMarkError::Ocr { .. }));
}

#[tokio::test]
async fn zerox_extract_only_skips_ocr_even_without_explicit_direct_image_flag() {
    let source_dir = tempfile::tempdir().unwrap();
    let source_file = write_square_png(source_dir.path(), "input.png", 10);

    let ocr_calls = Arc::new(AtomicUsize::new(0));
    let ocr_calls_inner = Arc::clone(&ocr_calls);
    let ocr_fn: docmark::model::CustomModelFunction = Arc::new(move |args: OcrArgs| {
        let ocr_calls_inner = Arc::clone(&ocr_calls_inner);
        Box::pin(async move {
            ocr_calls_inner.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DocMarkError>(CompletionResponse {
                content: "# should not run".to_string(),
                input_tokens: args.buffers.len() as u64,
                output_tokens: 1,
                logprobs: None,
            })
        })
    });

    let mut args = ocr_only_args(source_file.to_str().unwrap().to_string(), None, true);
    args.extract_only = true;
    // direct_image_extraction is deliberately left false: extract_only alone
    // must still select the image-only path and skip OCR entirely.
    args.direct_image_extraction = false;
    args.custom_model_function = Some(ocr_fn);

    let result = zerox(args).await.unwrap();

    assert_eq!(ocr_calls.load(Ordering::SeqCst), 0, "extract_only must not trigger a real OCR pass");
    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].status, PageStatus::Success);
    assert_eq!(result.pages[0].content, "", "extract_only clears page content");
}

#[tokio::test]
async fn zerox_cleans_up_temp_directory_when_cleanup_is_true() {
    let source_dir = tempfile::tempdir().unwrap();
    let source_file = write_square_png(source_dir.path(), "input.png", 10);

    let parent_temp_dir = tempfile::tempdir().unwrap();
    let entries_before = std::fs::read_dir(parent_temp_dir.path()).unwrap().count();

    let args = ocr_only_args(source_file.to_str().unwrap().to_string(), Some(parent_temp_dir.path().to_path_buf()), true);
    let result = zerox(args).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].status, PageStatus::Success);

    let entries_after = std::fs::read_dir(parent_temp_dir.path()).unwrap().count();
    assert_eq!(entries_before, entries_after, "docmark-* temp dir must be removed when cleanup=true");
}

#[tokio::test]
async fn zerox_keeps_temp_directory_when_cleanup_is_false() {
    let source_dir = tempfile::tempdir().unwrap();
    let source_file = write_square_png(source_dir.path(), "input.png", 10);

    let parent_temp_dir = tempfile::tempdir().unwrap();
    let args = ocr_only_args(source_file.to_str().unwrap().to_string(), Some(parent_temp_dir.path().to_path_buf()), false);
    zerox(args).await.unwrap();

    let entries_after = std::fs::read_dir(parent_temp_dir.path()).unwrap().count();
    assert_eq!(entries_after, 1, "temp dir must survive when cleanup=false");
}

fn ocr_only_args(file_path: String, temp_dir: Option<PathBuf>, cleanup: bool) -> PipelineArgs {
    let ocr_fn: docmark::model::CustomModelFunction = Arc::new(|args: OcrArgs| {
        Box::pin(async move {
            Ok::<_, DocMarkError>(CompletionResponse {
                content: "# fixed markdown output".to_string(),
                input_tokens: args.buffers.len() as u64,
                output_tokens: 1,
                logprobs: None,
            })
        })
    });

    PipelineArgs {
        file_path,
        credentials: api_key_credentials(),
        model: "gpt-4o".to_string(),
        model_provider: docmark::model::ModelProviderKind::OpenAi,
        cleanup,
        concurrency: 2,
        correct_orientation: false,
        error_mode: ErrorMode::Ignore,
        maintain_format: false,
        max_retries: 0,
        max_tesseract_workers: -1,
        image_density: 300,
        image_height: None,
        max_image_size: 0,
        trim_edges: false,
        pages_to_convert_as_images: PageSpec::All(-1),
        temp_dir,
        output_dir: None,
        llm_params: json!({}),
        prompt: None,
        schema: None,
        extract_per_page: Vec::new(),
        extract_only: false,
        direct_image_extraction: false,
        enable_hybrid_extraction: false,
        extraction_model: None,
        extraction_model_provider: None,
        extraction_credentials: None,
        extraction_prompt: None,
        extraction_llm_params: None,
        want_logprobs: false,
        custom_model_function: Some(ocr_fn),
    }
}
