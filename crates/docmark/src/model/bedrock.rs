//! Bedrock-style adapter.
//!
//! Uses AWS SigV4-signed requests over an AWS-credentials variant. Building
//! and signing the request is delegated to the injected [`HttpTransport`] —
//! this crate does not implement SigV4 itself; a caller wires a transport
//! that signs outgoing requests with the credentials it is given.

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

pub struct BedrockProvider {
    transport: Arc<dyn HttpTransport>,
}

impl BedrockProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn endpoint(&self, credentials: &Credentials, model: &str) -> Result<String> {
        let Credentials::Aws { region, .. } = credentials else {
            return Err(DocMarkError::config("Bedrock adapter requires AWS credentials"));
        };
        Ok(format!("https://bedrock-runtime.{region}.amazonaws.com/model/{model}/invoke"))
    }

    fn headers(&self, credentials: &Credentials) -> Result<HashMap<String, String>> {
        let Credentials::Aws { session_token, .. } = credentials else {
            return Err(DocMarkError::config("Bedrock adapter requires AWS credentials"));
        };
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(token) = session_token {
            headers.insert("X-Amz-Security-Token".to_string(), token.clone());
        }
        Ok(headers)
    }

    fn parse_response(&self, body: &Value) -> Result<CompletionResponse> {
        let content = body["content"][0]["text"]
            .as_str()
            .ok_or_else(|| DocMarkError::Other("provider response missing content".to_string()))?
            .to_string();
        let input_tokens = body["usage"]["inputTokens"].as_u64().unwrap_or(0);
        let output_tokens = body["usage"]["outputTokens"].as_u64().unwrap_or(0);
        Ok(CompletionResponse { content, input_tokens, output_tokens, logprobs: None })
    }
}

#[async_trait]
impl ModelProvider for BedrockProvider {
    async fn ocr(&self, args: OcrArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let parts = build_ocr_content_parts(&args, DEFAULT_OCR_PROMPT);
        let mut payload = args.llm_params.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("anthropic_version".to_string(), Value::String("bedrock-2023-05-31".to_string()));
            obj.insert(
                "messages".to_string(),
                serde_json::json!([{ "role": "user", "content": parts }]),
            );
        }
        let url = self.endpoint(credentials, &args.model)?;
        let body = self.transport.post_json(&url, self.headers(credentials)?, payload).await?;
        self.parse_response(&body)
    }

    async fn extract(&self, args: ExtractionArgs, credentials: &Credentials) -> Result<CompletionResponse> {
        let prompt = args.prompt.as_deref().unwrap_or(DEFAULT_EXTRACTION_PROMPT);
        let parts = build_extraction_content_parts(&args.input, prompt)?;
        let mut payload = args.llm_params.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("anthropic_version".to_string(), Value::String("bedrock-2023-05-31".to_string()));
            obj.insert(
                "messages".to_string(),
                serde_json::json!([{ "role": "user", "content": parts }]),
            );
            obj.insert(
                "tools".to_string(),
                serde_json::json!([{
                    "name": "extraction",
                    "input_schema": args.schema,
                }]),
            );
            obj.insert("tool_choice".to_string(), serde_json::json!({ "type": "tool", "name": "extraction" }));
        }
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
        captured: Mutex<Option<(String, HashMap<String, String>, Value)>>,
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn post_json(&self, url: &str, headers: HashMap<String, String>, body: Value) -> Result<Value> {
            *self.captured.lock().unwrap() = Some((url.to_string(), headers, body));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn builds_invoke_url_and_parses_anthropic_shaped_response() {
        let response = serde_json::json!({
            "content": [{ "text": "Bedrock out" }],
            "usage": { "inputTokens": 6, "outputTokens": 9 },
        });
        let transport = Arc::new(FakeTransport { response, captured: Mutex::new(None) });
        let provider = BedrockProvider::new(transport.clone());
        let credentials = Credentials::Aws {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "secret".to_string(),
            region: "us-east-1".to_string(),
            session_token: Some("tok".to_string()),
        };
        let args = OcrArgs {
            buffers: vec![vec![9]],
            maintain_format: false,
            prior_page: String::new(),
            prompt: None,
            model: "anthropic.claude-3-sonnet".to_string(),
            llm_params: serde_json::json!({}),
            want_logprobs: false,
        };

        let result = provider.ocr(args, &credentials).await.unwrap();
        assert_eq!(result.content, "Bedrock out");
        assert_eq!(result.input_tokens, 6);
        assert_eq!(result.output_tokens, 9);

        let (url, headers, body) = transport.captured.lock().unwrap().clone().unwrap();
        assert_eq!(url, "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-sonnet/invoke");
        assert_eq!(headers.get("X-Amz-Security-Token").unwrap(), "tok");
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
    }

    #[tokio::test]
    async fn non_aws_credentials_are_a_config_error() {
        let transport = Arc::new(FakeTransport { response: serde_json::json!({}), captured: Mutex::new(None) });
        let provider = BedrockProvider::new(transport);
        let credentials = Credentials::ApiKey { api_key: "nope".to_string(), endpoint: None };
        let args = ExtractionArgs {
            input: crate::types::ExtractionInput::TextOnly("doc text".to_string()),
            prompt: None,
            schema: serde_json::json!({}),
            model: "anthropic.claude-3-sonnet".to_string(),
            llm_params: serde_json::json!({}),
            want_logprobs: false,
        };
        let err = provider.extract(args, &credentials).await.unwrap_err();
        assert!(matches!(err, DocMarkError::Config { .. }));
    }
}
