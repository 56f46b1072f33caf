//! Google (Gemini / Vertex AI) adapter.
//!
//! Google's `generateContent` API uses `parts`/`inlineData` instead of
//! OpenAI's `content`/`image_url` shape, and represents abstract knobs like
//! `thinking_level`/`media_resolution` as provider-specific constants on
//! Gemini-3-family models. Vertex deployments (service-account credentials)
//! reject `thinking_level` outright.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::casing::{rewrite_keys, to_snake_case};
use super::transport::HttpTransport;
use super::{CompletionResponse, ExtractionArgs, ModelProvider, OcrArgs, DEFAULT_EXTRACTION_PROMPT, DEFAULT_OCR_PROMPT};
use base64::Engine as _;
use crate::error::{DocMarkError, Result};
use crate::types::Credentials;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GoogleProvider {
    transport: Arc<dyn HttpTransport>,
}

impl GoogleProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn is_vertex(credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::ServiceAccount { .. })
    }

    fn endpoint(&self, credentials: &Credentials, model: &str) -> Result<String> {
        match credentials {
            Credentials::ApiKey { api_key, endpoint } => {
                let base = endpoint.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                Ok(format!("{}/{model}:generateContent?key={api_key}", base.trim_end_matches('/')))
            }
            Credentials::ServiceAccount { location, .. } => {
                Ok(format!("https://{location}-aiplatform.googleapis.com/v1/models/{model}:generateContent"))
            }
            Credentials::Aws { .. } => Err(DocMarkError::config("Google adapter requires API-key or service-account credentials")),
        }
    }

    fn headers(&self, credentials: &Credentials) -> Result<HashMap<String, String>> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Credentials::ServiceAccount { .. } = credentials {
            headers.insert("Authorization".to_string(), "Bearer <service-account-token>".to_string());
        }
        Ok(headers)
    }

    fn build_generation_config(&self, llm_params: &Value, credentials: &Credentials, model: &str) -> Value {
        let mut config = rewrite_keys(llm_params, to_snake_case);
        if let Some(obj) = config.as_object_mut() {
            if Self::is_vertex(credentials) {
                obj.remove("thinking_level");
            } else if model.contains("gemini-3") {
                if let Some(level) = obj.remove("thinking_level") {
                    obj.insert(
                        "thinking_config".to_string(),
                        serde_json::json!({ "thinking_level": level }),
                    );
                }
                if let Some(resolution) = obj.remove("media_resolution") {
                    obj.insert("media_resolution".to_string(), resolution);
                }
            }
        }
        config
    }

    fn parse_response(&self, body: &Value) -> Result<CompletionResponse> {
        let content = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| DocMarkError::Other("provider response missing content".to_string()))?
            .to_string();
        let input_tokens = body["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0);
        let output_tokens = body["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0);
        Ok(CompletionResponse { content, input_tokens, output_tokens, logprobs: None })
    }
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    async fn ocr(&self, args: OcrArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let mut parts: Vec<Value> = args
            .buffers
            .iter()
            .map(|buffer| {
                serde_json::json!({
                    "inlineData": {
                        "mimeType": "image/png",
                        "data": base64::engine::general_purpose::STANDARD.encode(buffer),
                    }
                })
            })
            .collect();
        if args.maintain_format && !args.prior_page.is_empty() {
            parts.push(serde_json::json!({ "text": format!(
                "Markdown must maintain consistent formatting with the following page:\n\n```markdown\n{}\n```",
                args.prior_page
            )}));
        }
        let prompt = args.prompt.clone().unwrap_or_else(|| DEFAULT_OCR_PROMPT.to_string());
        parts.push(serde_json::json!({ "text": prompt }));

        let generation_config = self.build_generation_config(&args.llm_params, credentials, &args.model);
        let payload = serde_json::json!({
            "contents": [{ "parts": parts }],
            "generationConfig": generation_config,
        });
        let url = self.endpoint(credentials, &args.model)?;
        let body = self.transport.post_json(&url, self.headers(credentials)?, payload).await?;
        self.parse_response(&body)
    }

    async fn extract(&self, args: ExtractionArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let mut parts = Vec::new();
        match &args.input {
            crate::types::ExtractionInput::TextOnly(text) => parts.push(serde_json::json!({ "text": text })),
            crate::types::ExtractionInput::ImagesOnly(paths) => {
                for path in paths {
                    let buffer = std::fs::read(path)?;
                    parts.push(serde_json::json!({
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": base64::engine::general_purpose::STANDARD.encode(&buffer),
                        }
                    }));
                }
            }
            crate::types::ExtractionInput::Hybrid { image_paths, text } => {
                for path in image_paths {
                    let buffer = std::fs::read(path)?;
                    parts.push(serde_json::json!({
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": base64::engine::general_purpose::STANDARD.encode(&buffer),
                        }
                    }));
                }
                parts.push(serde_json::json!({ "text": text }));
            }
        }
        let prompt = args.prompt.clone().unwrap_or_else(|| DEFAULT_EXTRACTION_PROMPT.to_string());
        parts.push(serde_json::json!({ "text": prompt }));

        let mut generation_config = self.build_generation_config(&args.llm_params, credentials, &args.model);
        if let Some(obj) = generation_config.as_object_mut() {
            obj.insert("responseMimeType".to_string(), Value::String("application/json".to_string()));
            obj.insert("responseSchema".to_string(), args.schema.clone());
        }
        let payload = serde_json::json!({
            "contents": [{ "parts": parts }],
            "generationConfig": generation_config,
        });
        let url = self.endpoint(credentials, &args.model)?;
        let body = self.transport.post_json(&url, self.headers(credentials)?, payload).await?;
        self.parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeTransport {
        response: Value,
        captured: Mutex<Option<(String, Value)>>,
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn post_json(&self, url: &str, _headers: HashMap<String, String>, body: Value) -> Result<Value> {
            *self.captured.lock().unwrap() = Some((url.to_string(), body));
            Ok(self.response.clone())
        }
    }

    fn sample_args(model: &str, llm_params: Value) -> OcrArgs {
        OcrArgs {
            buffers: vec![vec![1, 2]],
            maintain_format: false,
            prior_page: String::new(),
            prompt: None,
            model: model.to_string(),
            llm_params,
            want_logprobs: false,
        }
    }

    #[tokio::test]
    async fn builds_api_key_url_and_parses_usage_metadata() {
        let response = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "Gemini out" }] } }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 4 },
        });
        let transport = Arc::new(FakeTransport { response, captured: Mutex::new(None) });
        let provider = GoogleProvider::new(transport.clone());
        let credentials = Credentials::ApiKey { api_key: "gkey".to_string(), endpoint: None };

        let result = provider.ocr(sample_args("gemini-2.0-flash", serde_json::json!({})), &credentials).await.unwrap();
        assert_eq!(result.content, "Gemini out");
        assert_eq!(result.input_tokens, 7);
        assert_eq!(result.output_tokens, 4);

        let (url, _) = transport.captured.lock().unwrap().clone().unwrap();
        assert_eq!(url, "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=gkey");
    }

    #[tokio::test]
    async fn gemini_3_moves_thinking_level_into_nested_config() {
        let response = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }],
            "usageMetadata": {},
        });
        let transport = Arc::new(FakeTransport { response, captured: Mutex::new(None) });
        let provider = GoogleProvider::new(transport.clone());
        let credentials = Credentials::ApiKey { api_key: "gkey".to_string(), endpoint: None };

        provider
            .ocr(sample_args("gemini-3-pro", serde_json::json!({"thinkingLevel": "high"})), &credentials)
            .await
            .unwrap();

        let (_, body) = transport.captured.lock().unwrap().clone().unwrap();
        assert_eq!(body["generationConfig"]["thinking_config"]["thinking_level"], "high");
        assert!(body["generationConfig"].get("thinking_level").is_none());
    }

    #[tokio::test]
    async fn vertex_credentials_drop_thinking_level_entirely() {
        let response = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }],
            "usageMetadata": {},
        });
        let transport = Arc::new(FakeTransport { response, captured: Mutex::new(None) });
        let provider = GoogleProvider::new(transport.clone());
        let credentials =
            Credentials::ServiceAccount { service_account: serde_json::json!({"type": "service_account"}), location: "us-central1".to_string() };

        provider
            .ocr(sample_args("gemini-3-pro", serde_json::json!({"thinkingLevel": "high"})), &credentials)
            .await
            .unwrap();

        let (url, body) = transport.captured.lock().unwrap().clone().unwrap();
        assert!(url.starts_with("https://us-central1-aiplatform.googleapis.com/"));
        assert!(body["generationConfig"].get("thinking_level").is_none());
        assert!(body["generationConfig"].get("thinking_config").is_none());
    }
}
