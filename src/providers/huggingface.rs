use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ensure_success, excerpt, http_client, Provider};
use crate::errors::ProviderError;

/// Default hosted inference route; the model id is appended to it
pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";

/// Default many-to-many translation model
pub const DEFAULT_MODEL: &str = "facebook/mbart-large-50-many-to-many-mmt";

/// Client for the Hugging Face hosted inference API
pub struct HuggingFace {
    /// HTTP client for API requests
    client: Client,
    /// Base inference URL
    endpoint: String,
    /// Model identifier, e.g. `facebook/mbart-large-50-many-to-many-mmt`
    model: String,
    /// Bearer token
    api_token: String,
}

impl std::fmt::Debug for HuggingFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFace")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Inference request: a list input is translated item by item, in order
#[derive(Debug, Serialize)]
pub struct HuggingFaceRequest {
    /// Texts to translate
    pub inputs: Vec<String>,
    /// Generation parameters
    pub parameters: HuggingFaceParameters,
}

/// Language parameters understood by mBART-style pipelines
#[derive(Debug, Serialize)]
pub struct HuggingFaceParameters {
    /// Source language tag
    pub src_lang: String,
    /// Target language tag
    pub tgt_lang: String,
}

/// Top-level response body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HuggingFaceResponse {
    /// One item per input
    Items(Vec<HuggingFaceItem>),
    /// Anything else (error objects, single dicts, ...)
    Unrecognized(serde_json::Value),
}

/// A single response item
///
/// Translation pipelines answer with `translation_text`, text2text pipelines
/// with `generated_text`. Other shapes are kept so they can be reported.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HuggingFaceItem {
    /// `{"translation_text": "..."}`
    Translation {
        /// Translated text
        translation_text: String,
    },
    /// `{"generated_text": "..."}`
    Generated {
        /// Generated text
        generated_text: String,
    },
    /// Any other item shape
    Unrecognized(serde_json::Value),
}

impl HuggingFaceItem {
    /// The translated text carried by this item, if its shape is known
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Translation { translation_text } => Some(translation_text),
            Self::Generated { generated_text } => Some(generated_text),
            Self::Unrecognized(value) => {
                debug!("Ignoring unrecognized response item: {}", excerpt(&value.to_string(), 120));
                None
            }
        }
    }
}

impl HuggingFace {
    /// Create a new client
    pub fn new(
        api_token: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let endpoint = endpoint.into();
        let model = model.into();
        Self {
            client: http_client("huggingface", Client::builder().timeout(Duration::from_secs(timeout_secs))),
            endpoint: if endpoint.is_empty() { DEFAULT_ENDPOINT.to_string() } else { endpoint },
            model: if model.is_empty() { DEFAULT_MODEL.to_string() } else { model },
            api_token: api_token.into(),
        }
    }

    /// Full inference URL for the configured model
    pub fn api_url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model)
    }

    /// Decode a raw response body
    pub fn decode(body: &str) -> Result<HuggingFaceResponse, ProviderError> {
        serde_json::from_str(body)
            .map_err(|e| ProviderError::ParseError(format!("{} in {}", e, excerpt(body, 200))))
    }
}

#[async_trait]
impl Provider for HuggingFace {
    type Request = HuggingFaceRequest;
    type Response = HuggingFaceResponse;

    fn name(&self) -> &str {
        "huggingface"
    }

    fn build_request(&self, texts: &[String], source_tag: &str, target_tag: &str) -> Self::Request {
        HuggingFaceRequest {
            inputs: texts.to_vec(),
            parameters: HuggingFaceParameters {
                src_lang: source_tag.to_string(),
                tgt_lang: target_tag.to_string(),
            },
        }
    }

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let response = ensure_success(self.name(), response).await?;
        let body = response.text().await.map_err(ProviderError::from_transport)?;

        Self::decode(&body)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = self.build_request(&["Hello".to_string()], "en_XX", "fr_XX");
        let response = self.complete(request).await?;
        Self::extract_translations(response).map(|_| ())
    }

    fn extract_translations(response: Self::Response) -> Result<Vec<Option<String>>, ProviderError> {
        match response {
            HuggingFaceResponse::Items(items) => {
                Ok(items.into_iter().map(HuggingFaceItem::into_text).collect())
            }
            HuggingFaceResponse::Unrecognized(value) => Err(ProviderError::UnrecognizedResponseShape(
                excerpt(&value.to_string(), 200),
            )),
        }
    }
}
