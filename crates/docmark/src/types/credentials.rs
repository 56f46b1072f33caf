//! Provider credential types.

use serde::{Deserialize, Serialize};

/// Credentials for one of the four provider families. The shape accepted by
/// each [`crate::model::ModelProvider`] adapter is the variant matching its
/// own [`crate::model::ModelProviderKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// OpenAI, Azure OpenAI, or a Google API-key deployment.
    ApiKey {
        api_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Bedrock-style, SigV4-signed credentials.
    Aws {
        access_key_id: String,
        secret_access_key: String,
        region: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_token: Option<String>,
    },
    /// Google Vertex service-account credentials.
    ServiceAccount { service_account: serde_json::Value, location: String },
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        match self {
            Credentials::ApiKey { api_key, .. } => api_key.is_empty(),
            Credentials::Aws { access_key_id, secret_access_key, .. } => {
                access_key_id.is_empty() || secret_access_key.is_empty()
            }
            Credentials::ServiceAccount { service_account, .. } => service_account.is_null(),
        }
    }
}
