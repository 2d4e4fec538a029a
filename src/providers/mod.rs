/*!
 * Provider implementations for machine-translation backends.
 *
 * This module contains client implementations for the supported backends:
 * - Hugging Face: hosted inference endpoint for seq2seq translation models
 * - Self-hosted: a translation server exposing a `/translate` route
 * - Mock: an in-process backend with scripted behaviors, for tests and benchmarks
 */

use async_trait::async_trait;
use log::{error, warn};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all MT providers
///
/// This trait defines the request/response cycle of one backend. Every provider
/// is usable as a [`TranslationBackend`] through the blanket implementation below.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Build the request for an ordered list of texts
    ///
    /// # Arguments
    /// * `texts` - Source strings, in document order
    /// * `source_tag` - Backend tag of the source language
    /// * `target_tag` - Backend tag of the target language
    fn build_request(&self, texts: &[String], source_tag: &str, target_tag: &str) -> Self::Request;

    /// Complete a request using this provider
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract the per-item translations from a response, in response order
    ///
    /// Items the provider answered in an unknown shape come back as `None`.
    fn extract_translations(response: Self::Response) -> Result<Vec<Option<String>>, ProviderError>;
}

/// Object-safe view of a provider: one ordered batch in, one ordered batch out
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Identifier used in logs
    fn backend_name(&self) -> &str;

    /// Translate `texts` from `source_tag` to `target_tag`
    ///
    /// On success the result has exactly `texts.len()` elements, element `i`
    /// being the translation of `texts[i]` (or `None` if that item failed).
    async fn translate_batch(
        &self,
        texts: &[String],
        source_tag: &str,
        target_tag: &str,
    ) -> Result<Vec<Option<String>>, ProviderError>;

    /// Check that the backend is reachable
    async fn check_connection(&self) -> Result<(), ProviderError>;
}

#[async_trait]
impl<P> TranslationBackend for P
where
    P: Provider,
{
    fn backend_name(&self) -> &str {
        self.name()
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_tag: &str,
        target_tag: &str,
    ) -> Result<Vec<Option<String>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.build_request(texts, source_tag, target_tag);
        let response = self.complete(request).await?;
        let translations = P::extract_translations(response)?;

        // Results are matched to inputs by position only
        if translations.len() != texts.len() {
            return Err(ProviderError::LengthMismatch {
                expected: texts.len(),
                actual: translations.len(),
            });
        }

        Ok(translations)
    }

    async fn check_connection(&self) -> Result<(), ProviderError> {
        self.test_connection().await
    }
}

/// Turn a non-success HTTP response into a provider error, passing successes through
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", provider, status, error_text);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ProviderError::AuthenticationError(error_text))
        }
        _ => Err(ProviderError::ApiError {
            status_code: status.as_u16(),
            message: error_text,
        }),
    }
}

/// Build the HTTP client of a provider
///
/// A builder that fails falls back to reqwest's defaults, which carry no
/// request timeout; the batch translator's call timeout still bounds each call.
pub(crate) fn http_client(provider: &str, builder: ClientBuilder) -> Client {
    builder.build().unwrap_or_else(|e| {
        warn!("{} HTTP client could not be configured, using defaults: {}", provider, e);
        Client::default()
    })
}

/// Shorten a response body for inclusion in an error message
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

pub mod huggingface;
pub mod self_hosted;
pub mod mock;
