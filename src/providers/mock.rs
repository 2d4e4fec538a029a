/*!
 * Mock provider implementation for testing.
 *
 * This module provides a mock backend that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds, one translation per input
 * - `MockProvider::intermittent(n)` - Every nth request fails
 * - `MockProvider::failing()` - Always fails with an API error
 * - `MockProvider::malformed()` - Answers in an unrecognized response shape
 * - `MockProvider::dropping_items(n)` - Every nth item comes back untranslated
 * - `MockProvider::short_response()` - Answers with one item too few
 *
 * Every request is recorded so tests can inspect exactly what was sent.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Mock request for testing
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// The texts to translate
    pub texts: Vec<String>,
    /// Source language tag
    pub source_tag: String,
    /// Target language tag
    pub target_tag: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// One entry per item; `None` simulates an unrecognized item
    pub items: Vec<Option<String>>,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a translation for each item
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Response has a shape the decoder does not know
    Malformed,
    /// Every Nth item of a batch (1-based) comes back without a translation
    DroppingItems { every: usize },
    /// Returns one item fewer than requested
    ShortResponse,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every request received, in arrival order
    requests: Arc<Mutex<Vec<MockRequest>>>,
    /// Custom translation function (text, target tag) -> translation
    custom_translation: Option<fn(&str, &str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_translation: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that answers in an unknown response shape
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create a mock that drops every nth item of each batch
    pub fn dropping_items(every: usize) -> Self {
        Self::new(MockBehavior::DroppingItems { every: every.max(1) })
    }

    /// Create a mock that returns fewer items than it was sent
    pub fn short_response() -> Self {
        Self::new(MockBehavior::ShortResponse)
    }

    /// Create a mock that sleeps before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom translation function
    pub fn with_custom_translation(mut self, translate: fn(&str, &str) -> String) -> Self {
        self.custom_translation = Some(translate);
        self
    }

    /// The translation the working behavior produces for `text`
    pub fn expected_translation(text: &str, target_tag: &str) -> String {
        format!("[{}] {}", target_tag, text)
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of every request received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// The text payload of every request received so far
    pub fn received_batches(&self) -> Vec<Vec<String>> {
        self.requests.lock().iter().map(|r| r.texts.clone()).collect()
    }

    fn translate_all(&self, request: &MockRequest) -> Vec<Option<String>> {
        request
            .texts
            .iter()
            .map(|text| match self.custom_translation {
                Some(translate) => Some(translate(text, &request.target_tag)),
                None => Some(Self::expected_translation(text, &request.target_tag)),
            })
            .collect()
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_translation: self.custom_translation,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    fn name(&self) -> &str {
        "mock"
    }

    fn build_request(&self, texts: &[String], source_tag: &str, target_tag: &str) -> Self::Request {
        MockRequest {
            texts: texts.to_vec(),
            source_tag: source_tag.to_string(),
            target_tag: target_tag.to_string(),
        }
    }

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(MockResponse {
                items: self.translate_all(&request),
            }),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(MockResponse {
                        items: self.translate_all(&request),
                    })
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Malformed => Err(ProviderError::UnrecognizedResponseShape(
                r#"{"unexpected": true}"#.to_string(),
            )),

            MockBehavior::DroppingItems { every } => {
                let items = self
                    .translate_all(&request)
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| if (i + 1) % every == 0 { None } else { item })
                    .collect();
                Ok(MockResponse { items })
            }

            MockBehavior::ShortResponse => {
                let mut items = self.translate_all(&request);
                items.pop();
                Ok(MockResponse { items })
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(MockResponse {
                    items: self.translate_all(&request),
                })
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated outage".to_string())),
            _ => Ok(()),
        }
    }

    fn extract_translations(response: Self::Response) -> Result<Vec<Option<String>>, ProviderError> {
        Ok(response.items)
    }
}
