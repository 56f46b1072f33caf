//! OpenAI-family adapter (also used directly by OpenAI-compatible gateways).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::casing::{rewrite_keys, to_snake_case};
use super::transport::HttpTransport;
use super::{
    build_extraction_content_parts, build_ocr_content_parts, requires_max_completion_tokens, CompletionResponse,
    ExtractionArgs, ModelProvider, OcrArgs, DEFAULT_EXTRACTION_PROMPT, DEFAULT_OCR_PROMPT,
};
use crate::error::{DocMarkError, Result};
use crate::types::Credentials;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    transport: Arc<dyn HttpTransport>,
}

impl OpenAiProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn endpoint(&self, credentials: &Credentials) -> String {
        let base = match credentials {
            Credentials::ApiKey { endpoint: Some(endpoint), .. } => endpoint.clone(),
            _ => DEFAULT_BASE_URL.to_string(),
        };
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn headers(&self, credentials: &Credentials) -> Result<HashMap<String, String>> {
        let Credentials::ApiKey { api_key, .. } = credentials else {
            return Err(DocMarkError::config("OpenAI adapter requires API-key credentials"));
        };
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {api_key}"));
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Ok(headers)
    }

    fn apply_token_param(&self, mut params: Value, model: &str) -> Value {
        if let Some(obj) = params.as_object_mut() {
            if let Some(tokens) = obj.remove("max_tokens") {
                let key = if requires_max_completion_tokens(model) { "max_completion_tokens" } else { "max_tokens" };
                obj.insert(key.to_string(), tokens);
            }
        }
        params
    }

    fn parse_response(&self, body: &Value) -> Result<CompletionResponse> {
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| DocMarkError::Other("provider response missing content".to_string()))?
            .to_string();
        let input_tokens = body["usage"]["prompt_tokens"].as_u64().unwrap_or(0);
        let output_tokens = body["usage"]["completion_tokens"].as_u64().unwrap_or(0);
        let logprobs = body["choices"][0]["logprobs"].clone();
        let logprobs = if logprobs.is_null() { None } else { Some(rewrite_keys(&logprobs, super::casing::to_camel_case)) };
        Ok(CompletionResponse { content, input_tokens, output_tokens, logprobs })
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn ocr(&self, args: OcrArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let parts = build_ocr_content_parts(&args, DEFAULT_OCR_PROMPT);
        let mut params = rewrite_keys(&args.llm_params, to_snake_case);
        params = self.apply_token_param(params, &args.model);
        if let Some(obj) = params.as_object_mut() {
            obj.insert("model".to_string(), Value::String(args.model.clone()));
            obj.insert(
                "messages".to_string(),
                serde_json::json!([{ "role": "user", "content": parts }]),
            );
            if args.want_logprobs {
                obj.insert("logprobs".to_string(), Value::Bool(true));
            }
        }
        let body = self.transport.post_json(&self.endpoint(credentials), self.headers(credentials)?, params).await?;
        self.parse_response(&body)
    }

    async fn extract(&self, args: ExtractionArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let prompt = args.prompt.as_deref().unwrap_or(DEFAULT_EXTRACTION_PROMPT);
        let parts = build_extraction_content_parts(&args.input, prompt)?;
        let mut params = rewrite_keys(&args.llm_params, to_snake_case);
        params = self.apply_token_param(params, &args.model);
        if let Some(obj) = params.as_object_mut() {
            obj.insert("model".to_string(), Value::String(args.model.clone()));
            obj.insert(
                "messages".to_string(),
                serde_json::json!([{ "role": "user", "content": parts }]),
            );
            obj.insert(
                "response_format".to_string(),
                serde_json::json!({
                    "type": "json_schema",
                    "json_schema": { "name": "extraction", "schema": args.schema },
                }),
            );
            if args.want_logprobs {
                obj.insert("logprobs".to_string(), Value::Bool(true));
            }
        }
        let body = self.transport.post_json(&self.endpoint(credentials), self.headers(credentials)?, params).await?;
        self.parse_response(&body)
    }
}
