//! HTTP transport abstraction.
//!
//! Provider adapters talk to this trait rather than to `reqwest` directly so
//! they can be exercised in tests without live network access.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, url: &str, headers: HashMap<String, String>, body: Value) -> Result<Value>;
}

/// Default transport backed by `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(300))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, headers: HashMap<String, String>, body: Value) -> Result<Value> {
        let mut request = self.client.post(url).json(&body);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;
        if !status.is_success() {
            return Err(crate::error::DocMarkError::Other(format!(
                "provider returned {status}: {payload}"
            )));
        }
        Ok(payload)
    }
}
