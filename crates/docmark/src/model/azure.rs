//! Azure OpenAI adapter.
//!
//! Wire shape mirrors OpenAI's chat-completions API, but parameters are kept
//! in camelCase and authentication uses the `api-key` header plus a
//! `deployment`/`api-version` URL pattern instead of a bearer token.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::transport::HttpTransport;
use super::{
    build_extraction_content_parts, build_ocr_content_parts, CompletionResponse, ExtractionArgs, ModelProvider,
    OcrArgs, DEFAULT_EXTRACTION_PROMPT, DEFAULT_OCR_PROMPT,
};
use crate::error::{DocMarkError, Result};
use crate::types::Credentials;

const API_VERSION: &str = "2024-10-21";

pub struct AzureProvider {
    transport: Arc<dyn HttpTransport>,
}

impl AzureProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn endpoint(&self, credentials: &Credentials, model: &str) -> Result<String> {
        let Credentials::ApiKey { endpoint: Some(endpoint), .. } = credentials else {
            return Err(DocMarkError::config("Azure adapter requires an endpoint in the API-key credentials"));
        };
        Ok(format!(
            "{}/openai/deployments/{model}/chat/completions?api-version={API_VERSION}",
            endpoint.trim_end_matches('/')
        ))
    }

    fn headers(&self, credentials: &Credentials) -> Result<HashMap<String, String>> {
        let Credentials::ApiKey { api_key, .. } = credentials else {
            return Err(DocMarkError::config("Azure adapter requires API-key credentials"));
        };
        let mut headers = HashMap::new();
        headers.insert("api-key".to_string(), api_key.clone());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Ok(headers)
    }

    fn parse_response(&self, body: &Value) -> Result<CompletionResponse> {
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| DocMarkError::Other("provider response missing content".to_string()))?
            .to_string();
        let input_tokens = body["usage"]["promptTokens"]
            .as_u64()
            .or_else(|| body["usage"]["prompt_tokens"].as_u64())
            .unwrap_or(0);
        let output_tokens = body["usage"]["completionTokens"]
            .as_u64()
            .or_else(|| body["usage"]["completion_tokens"].as_u64())
            .unwrap_or(0);
        Ok(CompletionResponse { content, input_tokens, output_tokens, logprobs: None })
    }
}

#[async_trait]
impl ModelProvider for AzureProvider {
    async fn ocr(&self, args: OcrArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let parts = build_ocr_content_parts(&args, DEFAULT_OCR_PROMPT);
        let mut params = args.llm_params.clone();
        if let Some(obj) = params.as_object_mut() {
            obj.insert(
                "messages".to_string(),
                serde_json::json!([{ "role": "user", "content": parts }]),
            );
        }
        let url = self.endpoint(credentials, &args.model)?;
        let body = self.transport.post_json(&url, self.headers(credentials)?, params).await?;
        self.parse_response(&body)
    }

    async fn extract(&self, args: ExtractionArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let prompt = args.prompt.as_deref().unwrap_or(DEFAULT_EXTRACTION_PROMPT);
        let parts = build_extraction_content_parts(&args.input, prompt)?;
        let mut params = args.llm_params.clone();
        if let Some(obj) = params.as_object_mut() {
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
        }
        let url = self.endpoint(credentials, &args.model)?;
        let body = self.transport.post_json(&url, self.headers(credentials)?, params).await?;
        self.parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeTransport {
        response: Value,
        captured: Mutex<Option<(String, HashMap<String, String>)>>,
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn post_json(&self, url: &str, headers: HashMap<String, String>, _body: Value) -> Result<Value> {
            *self.captured.lock().unwrap() = Some((url.to_string(), headers));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn builds_deployment_url_and_api_key_header() {
        let response = serde_json::json!({
            "choices": [{ "message": { "content": "Azure out" } }],
            "usage": { "promptTokens": 3, "completionTokens": 2 },
        });
        let transport = Arc::new(FakeTransport { response, captured: Mutex::new(None) });
        let provider = AzureProvider::new(transport.clone());
        let credentials = Credentials::ApiKey {
            api_key: "azkey".to_string(),
            endpoint: Some("https://my-resource.openai.azure.com".to_string()),
        };
        let args = OcrArgs {
            buffers: vec![vec![1]],
            maintain_format: false,
            prior_page: String::new(),
            prompt: None,
            model: "gpt4o-deploy".to_string(),
            llm_params: serde_json::json!({}),
            want_logprobs: false,
        };

        let result = provider.ocr(args, &credentials).await.unwrap();
        assert_eq!(result.content, "Azure out");
        assert_eq!(result.input_tokens, 3);
        assert_eq!(result.output_tokens, 2);

        let (url, headers) = transport.captured.lock().unwrap().clone().unwrap();
        assert_eq!(
            url,
            "https://my-resource.openai.azure.com/openai/deployments/gpt4o-deploy/chat/completions?api-version=2024-10-21"
        );
        assert_eq!(headers.get("api-key").unwrap(), "azkey");
    }

    #[tokio::test]
    async fn missing_endpoint_is_a_config_error() {
        let transport = Arc::new(FakeTransport { response: serde_json::json!({}), captured: Mutex::new(None) });
        let provider = AzureProvider::new(transport);
        let credentials = Credentials::ApiKey { api_key: "azkey".to_string(), endpoint: None };
        let args = OcrArgs {
            buffers: vec![],
            maintain_format: false,
            prior_page: String::new(),
            prompt: None,
            model: "gpt4o-deploy".to_string(),
            llm_params: serde_json::json!({}),
            want_logprobs: false,
        };
        let err = provider.ocr(args, &credentials).await.unwrap_err();
        assert!(matches!(err, DocMarkError::Config { .. }));
    }
}

