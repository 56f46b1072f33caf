//! Model Abstraction: a uniform interface over the four provider families.
//!
//! Each provider is a tagged variant over a shared [`ModelProvider`] trait
//! rather than a class hierarchy, the same pattern the teacher uses for its
//! plugin extractors.

pub mod azure;
pub mod bedrock;
pub mod casing;
pub mod google;
pub mod openai;
pub mod transport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::types::Credentials;

/// Which capability is being invoked: OCR (markdown transcription) or
/// schema-driven structured extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    Ocr,
    Extraction,
}

/// Selects which adapter handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProviderKind {
    OpenAi,
    Azure,
    Google,
    Bedrock,
}

/// Arguments for an OCR call.
#[derive(Debug, Clone)]
pub struct OcrArgs {
    pub buffers: Vec<Vec<u8>>,
    pub maintain_format: bool,
    pub prior_page: String,
    pub prompt: Option<String>,
    pub model: String,
    pub llm_params: Value,
    pub want_logprobs: bool,
}

/// Arguments for an extraction call.
#[derive(Debug, Clone)]
pub struct ExtractionArgs {
    pub input: crate::types::ExtractionInput,
    pub prompt: Option<String>,
    pub schema: Value,
    pub model: String,
    pub llm_params: Value,
    pub want_logprobs: bool,
}

/// Raw provider response, normalized token counts plus un-processed content.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub logprobs: Option<Value>,
}

/// One provider family's implementation of the Model Abstraction.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn ocr(&self, args: OcrArgs, credentials: &Credentials) -> Result<CompletionResponse>;
    async fn extract(&self, args: ExtractionArgs, credentials: &Credentials) -> Result<CompletionResponse>;
}

/// A caller-supplied function that replaces the LLM call in OCR, given the
/// same [`OcrArgs`] signature as the provider adapters.
pub type CustomModelFunction =
    Arc<dyn Fn(OcrArgs) -> futures_boxed::BoxFuture<Result<CompletionResponse>> + Send + Sync>;

/// Minimal boxed-future alias so [`CustomModelFunction`] does not require a
/// `futures` dependency for a single type alias.
pub mod futures_boxed {
    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

/// Wraps a caller-supplied [`CustomModelFunction`] as the OCR half of a
/// [`ModelProvider`], delegating extraction to the provider the caller would
/// otherwise have used. The custom function still passes through the Retry
/// Runner and Completion Processor in the OCR Driver, since it is only
/// substituted at the point a real provider's `ocr` call would have been.
pub struct CustomFunctionProvider {
    ocr_fn: CustomModelFunction,
    delegate: Arc<dyn ModelProvider>,
}

impl CustomFunctionProvider {
    pub fn new(ocr_fn: CustomModelFunction, delegate: Arc<dyn ModelProvider>) -> Self {
        Self { ocr_fn, delegate }
    }
}

#[async_trait]
impl ModelProvider for CustomFunctionProvider {
    async fn ocr(&self, args: OcrArgs, _credentials: &Credentials) -> Result<CompletionResponse> {
        (self.ocr_fn)(args).await
    }

    async fn extract(&self, args: ExtractionArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        self.delegate.extract(args, credentials).await
    }
}

/// Encodes an image buffer as a base64 PNG data URL, the shape every
/// provider adapter sends as an `image_url` content part.
pub fn encode_image_data_url(buffer: &[u8]) -> String {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(buffer);
    format!("data:image/png;base64,{encoded}")
}

/// Builds the list of content parts in the mandated order: images first,
/// then the `maintain_format` consistency prompt (if any), then the system
/// prompt.
pub fn build_ocr_content_parts(args: &OcrArgs, default_prompt: &str) -> Vec<Value> {
    let mut parts: Vec<Value> = args
        .buffers
        .iter()
        .map(|buffer| {
            serde_json::json!({
                "type": "image_url",
                "image_url": { "url": encode_image_data_url(buffer) },
            })
        })
        .collect();

    if args.maintain_format && !args.prior_page.is_empty() {
        parts.push(serde_json::json!({
            "type": "text",
            "text": format!(
                "Markdown must maintain consistent formatting with the following page: \n\n```markdown\n{}\n```",
                args.prior_page
            ),
        }));
    }

    let prompt = args.prompt.as_deref().unwrap_or(default_prompt);
    parts.push(serde_json::json!({ "type": "text", "text": prompt }));
    parts
}

/// Builds the content parts for an extraction call, honoring the
/// text-only/direct-image/hybrid input variants.
pub fn build_extraction_content_parts(input: &crate::types::ExtractionInput, prompt: &str) -> Result<Vec<Value>> {
    let mut parts = Vec::new();
    match input {
        crate::types::ExtractionInput::TextOnly(text) => {
            parts.push(serde_json::json!({ "type": "text", "text": text }));
        }
        crate::types::ExtractionInput::ImagesOnly(paths) => {
            for path in paths {
                let buffer = std::fs::read(path)?;
                parts.push(serde_json::json!({
                    "type": "image_url",
                    "image_url": { "url": encode_image_data_url(&buffer) },
                }));
            }
        }
        crate::types::ExtractionInput::Hybrid { image_paths, text } => {
            for path in image_paths {
                let buffer = std::fs::read(path)?;
                parts.push(serde_json::json!({
                    "type": "image_url",
                    "image_url": { "url": encode_image_data_url(&buffer) },
                }));
            }
            parts.push(serde_json::json!({ "type": "text", "text": text }));
        }
    }
    parts.push(serde_json::json!({ "type": "text", "text": prompt }));
    Ok(parts)
}

pub const DEFAULT_OCR_PROMPT: &str =
    "Convert the following image to markdown. Return only the markdown with no explanation text.";
pub const DEFAULT_EXTRACTION_PROMPT: &str = "Extract schema data from the following content.";

/// Returns `true` for model identifiers that require `max_completion_tokens`
/// instead of `max_tokens` (OpenAI reasoning-family models).
pub fn requires_max_completion_tokens(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    model.starts_with('o') || model.starts_with("o3") || model.starts_with("o4") || model.starts_with("gpt-5")
}
