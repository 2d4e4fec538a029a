use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ensure_success, excerpt, http_client, Provider};
use crate::errors::ProviderError;

/// Default address of a self-hosted translation server
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Client for a self-hosted translation server exposing `POST /translate`
pub struct SelfHosted {
    /// HTTP client for API requests
    client: Client,
    /// Server base URL
    base_url: String,
}

impl std::fmt::Debug for SelfHosted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfHosted")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Translate request body
#[derive(Debug, Serialize)]
pub struct SelfHostedRequest {
    /// Texts to translate, in order
    pub text: Vec<String>,
    /// Source language tag
    pub src_lang: String,
    /// Target language tag
    pub tgt_lang: String,
}

/// Translate response body
#[derive(Debug, Deserialize)]
pub struct SelfHostedResponse {
    /// One translation per input text
    #[serde(default)]
    pub translated_texts: Vec<Option<String>>,
}

impl SelfHosted {
    /// Create a new client for the server at `base_url`
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let base_url = base_url.into();
        Self {
            client: http_client(
                "selfhosted",
                Client::builder()
                    .timeout(Duration::from_secs(timeout_secs))
                    .pool_idle_timeout(Duration::from_secs(90)),
            ),
            base_url: if base_url.is_empty() { DEFAULT_ENDPOINT.to_string() } else { base_url },
        }
    }

    /// Full URL of the translate route
    pub fn api_url(&self) -> String {
        format!("{}/translate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for SelfHosted {
    type Request = SelfHostedRequest;
    type Response = SelfHostedResponse;

    fn name(&self) -> &str {
        "selfhosted"
    }

    fn build_request(&self, texts: &[String], source_tag: &str, target_tag: &str) -> Self::Request {
        SelfHostedRequest {
            text: texts.to_vec(),
            src_lang: source_tag.to_string(),
            tgt_lang: target_tag.to_string(),
        }
    }

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let response = self
            .client
            .post(self.api_url())
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let response = ensure_success(self.name(), response).await?;
        let body = response.text().await.map_err(ProviderError::from_transport)?;

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::ParseError(format!("{} in {}", e, excerpt(&body, 200))))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = self.build_request(&["Hello".to_string()], "en_XX", "fr_XX");
        let response = self.complete(request).await?;
        Self::extract_translations(response).map(|_| ())
    }

    fn extract_translations(response: Self::Response) -> Result<Vec<Option<String>>, ProviderError> {
        if response.translated_texts.is_empty() {
            return Err(ProviderError::UnrecognizedResponseShape(
                "no translated_texts in response".to_string(),
            ));
        }

        Ok(response.translated_texts)
    }
}
