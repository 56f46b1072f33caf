//! The Orchestrator: the `zerox` public entrypoint. Validates arguments,
//! provisions the temp directory and Tesseract pool, and sequences the
//! pipeline's stages, tearing resources down on every exit path — the same
//! `let result = async { ... }.await;` release shape the teacher uses in
//! `core::extractor::file::extract_file`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::config::PipelineArgs;
use super::config_validation::validate_args;
use crate::acquisition::{acquire, is_structured_data_extension};
use crate::error::Result;
use crate::extraction_driver::{run_extraction, ExtractionDriverOptions, ExtractionMode};
use crate::image_utils::tesseract_pool::TesseractPool;
use crate::image_utils::CleanupOptions;
use crate::model::azure::AzureProvider;
use crate::model::bedrock::BedrockProvider;
use crate::model::google::GoogleProvider;
use crate::model::openai::OpenAiProvider;
use crate::model::transport::{HttpTransport, ReqwestTransport};
use crate::model::{CustomFunctionProvider, ModelProvider, ModelProviderKind};
use crate::ocr_driver::{run_ocr, OcrDriverOptions};
use crate::rasterize::{rasterize, PageSelection, RasterOptions};
use crate::schema::split_schema;
use crate::structured::read_structured_pages;
use crate::types::{LogprobPage, Logprobs, Page, PipelineResult, Summary};

fn provider_for(kind: ModelProviderKind, transport: Arc<dyn HttpTransport>) -> Arc<dyn ModelProvider> {
    match kind {
        ModelProviderKind::OpenAi => Arc::new(OpenAiProvider::new(transport)),
        ModelProviderKind::Azure => Arc::new(AzureProvider::new(transport)),
        ModelProviderKind::Google => Arc::new(GoogleProvider::new(transport)),
        ModelProviderKind::Bedrock => Arc::new(BedrockProvider::new(transport)),
    }
}

fn sanitize_file_name(name: &str) -> String {
    let collapsed: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let mut result = String::new();
    let mut last_was_underscore = false;
    for ch in collapsed.chars() {
        if ch == '_' {
            if !last_was_underscore {
                result.push(ch);
            }
            last_was_underscore = true;
        } else {
            result.push(ch);
            last_was_underscore = false;
        }
    }
    result.to_lowercase().chars().take(255).collect()
}

/// Records error details on the current span in OpenTelemetry-convention
/// field names, the same shape the teacher's `record_error` helper uses.
#[cfg(feature = "otel")]
fn record_error(error: &crate::error::DocMarkError) {
    let span = tracing::Span::current();
    span.record("otel.status_code", "ERROR");
    span.record("error.type", format!("{error:?}"));
    span.record("error.message", error.to_string());
}

/// Runs the full document-to-markdown(-and-optionally-JSON) pipeline.
#[cfg_attr(
    feature = "otel",
    tracing::instrument(skip(args), fields(file = %args.file_path, otel.status_code = tracing::field::Empty))
)]
#[cfg_attr(not(feature = "otel"), tracing::instrument(skip(args), fields(file = %args.file_path)))]
pub async fn zerox(args: PipelineArgs) -> Result<PipelineResult> {
    validate_args(&args)?;
    let started_at = Instant::now();

    let temp_dir = match &args.temp_dir {
        Some(dir) => tempfile::Builder::new().prefix("docmark-").tempdir_in(dir)?,
        None => tempfile::Builder::new().prefix("docmark-").tempdir()?,
    };

    let result = run_pipeline(&args, temp_dir.path()).await;

    if args.cleanup {
        drop(temp_dir);
    } else {
        let _ = temp_dir.keep();
    }

    #[cfg(feature = "otel")]
    if let Err(ref e) = result {
        record_error(e);
    }

    result.map(|mut pipeline_result| {
        pipeline_result.completion_time_ms = started_at.elapsed().as_millis() as u64;
        pipeline_result
    })
}

async fn run_pipeline(args: &PipelineArgs, temp_dir: &std::path::Path) -> Result<PipelineResult> {
    let acquired = acquire(&args.file_path, temp_dir).await?;

    let mut pages: Vec<Page>;
    let mut image_paths: Vec<PathBuf> = Vec::new();
    let extract_only = args.extract_only;
    // extract_only implies direct_image_extraction: there is no point OCR'ing
    // text the caller is about to discard.
    let direct_image_extraction = args.direct_image_extraction || extract_only;

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::default());
    let provider = provider_for(args.model_provider, Arc::clone(&transport));
    let provider: Arc<dyn ModelProvider> = match &args.custom_model_function {
        Some(ocr_fn) => Arc::new(CustomFunctionProvider::new(Arc::clone(ocr_fn), provider)),
        None => provider,
    };

    if is_structured_data_extension(&acquired.extension) {
        pages = read_structured_pages(&acquired.local_path)?;
    } else if extract_only && direct_image_extraction {
        let raster_options = RasterOptions {
            image_density: args.image_density,
            image_height: args.image_height,
            pages: PageSelection::from(&args.pages_to_convert_as_images),
        };
        image_paths =
            rasterize(&acquired.local_path, &acquired.extension, acquired.is_compound_binary, temp_dir, &raster_options)
                .await?;
        pages = image_paths
            .iter()
            .enumerate()
            .map(|(index, _)| Page::success(index + 1, String::new(), 0, 0))
            .collect();
    } else {
        let raster_options = RasterOptions {
            image_density: args.image_density,
            image_height: args.image_height,
            pages: PageSelection::from(&args.pages_to_convert_as_images),
        };
        image_paths =
            rasterize(&acquired.local_path, &acquired.extension, acquired.is_compound_binary, temp_dir, &raster_options)
                .await?;

        let tesseract_pool = if args.correct_orientation {
            Some(Arc::new(TesseractPool::new(image_paths.len(), args.max_tesseract_workers)))
        } else {
            None
        };

        let ocr_options = OcrDriverOptions {
            maintain_format: args.maintain_format,
            concurrency: args.concurrency,
            max_retries: args.max_retries,
            error_mode: args.error_mode,
            cleanup: CleanupOptions {
                correct_orientation: args.correct_orientation,
                trim_edges: args.trim_edges,
                max_image_size_bytes: args.max_image_size,
            },
            model: args.model.clone(),
            llm_params: args.llm_params.clone(),
            prompt: args.prompt.clone(),
            want_logprobs: args.want_logprobs,
        };

        let (ocr_pages, _totals) =
            run_ocr(&image_paths, Arc::clone(&provider), &args.credentials, tesseract_pool, &ocr_options).await?;
        pages = ocr_pages;
    }

    let mut input_tokens: u64 = pages.iter().filter_map(|p| p.input_tokens).sum();
    let mut output_tokens: u64 = pages.iter().filter_map(|p| p.output_tokens).sum();
    let ocr_summary = crate::types::StageSummary {
        successful: pages.iter().filter(|p| matches!(p.status, crate::types::PageStatus::Success)).count(),
        failed: pages.iter().filter(|p| matches!(p.status, crate::types::PageStatus::Error)).count(),
    };

    let mut extracted = None;
    let mut extraction_summary = None;
    let mut extraction_logprobs: Vec<LogprobPage> = Vec::new();

    if let Some(schema) = &args.schema {
        let split = split_schema(schema, &args.extract_per_page)?;

        let extraction_provider = match args.extraction_model_provider {
            Some(kind) => provider_for(kind, transport),
            None => provider,
        };
        let extraction_credentials = args.extraction_credentials.clone().unwrap_or_else(|| args.credentials.clone());

        let mode = if args.enable_hybrid_extraction {
            ExtractionMode::Hybrid
        } else if direct_image_extraction {
            ExtractionMode::DirectImage
        } else {
            ExtractionMode::TextOnly
        };

        let extraction_options = ExtractionDriverOptions {
            mode,
            concurrency: args.concurrency,
            max_retries: args.max_retries,
            model: args.extraction_model.clone().unwrap_or_else(|| args.model.clone()),
            llm_params: args.extraction_llm_params.clone().unwrap_or_else(|| args.llm_params.clone()),
            prompt: args.extraction_prompt.clone(),
            want_logprobs: args.want_logprobs,
        };

        let (value, summary, extraction_totals) =
            run_extraction(&split, &pages, &image_paths, extraction_provider, &extraction_credentials, &extraction_options)
                .await?;
        input_tokens += extraction_totals.input_tokens;
        output_tokens += extraction_totals.output_tokens;
        extracted = Some(value);
        extraction_summary = Some(summary);
        extraction_logprobs = extraction_totals.logprobs;
    }

    if extract_only {
        for page in &mut pages {
            page.clear_content();
        }
    }

    if let Some(output_dir) = &args.output_dir {
        tokio::fs::create_dir_all(output_dir).await?;
        let base_name = PathBuf::from(&args.file_path);
        let stem = base_name.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "document".to_string());
        let markdown = pages.iter().map(|p| p.content.as_str()).collect::<Vec<_>>().join("\n\n");
        let destination = output_dir.join(format!("{}.md", sanitize_file_name(&stem)));
        tokio::fs::write(destination, markdown).await?;
    }

    let file_name = PathBuf::from(&args.file_path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file_path.clone());

    let logprobs = if args.want_logprobs {
        let ocr_logprobs: Vec<LogprobPage> = pages
            .iter()
            .filter_map(|p| p.logprobs.clone().map(|value| LogprobPage { page: Some(p.page), value }))
            .collect();
        if ocr_logprobs.is_empty() && extraction_logprobs.is_empty() {
            None
        } else {
            Some(Logprobs { ocr: ocr_logprobs, extracted: extraction_logprobs })
        }
    } else {
        None
    };

    let total_pages = pages.len();
    Ok(PipelineResult {
        completion_time_ms: 0,
        file_name,
        input_tokens,
        output_tokens,
        pages,
        extracted,
        logprobs,
        summary: Summary { total_pages, ocr: Some(ocr_summary), extracted: extraction_summary },
    })
}
