/*!
 * Batch translation against the MT backend.
 *
 * `BatchTranslator` resolves the caller-facing target locale to the backend's
 * language tag, sends one ordered batch, and hands back exactly one result slot
 * per input. A batch either succeeds item by item or fails as a whole.
 */

use log::{debug, error, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{ProviderError, TranslationError};
use crate::language_utils::LanguageMap;
use crate::providers::TranslationBackend;

/// Default per-call bound on a backend request
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one batch call
#[derive(Debug)]
pub struct BatchOutcome {
    /// One slot per input text, in input order; `None` means not translated
    pub translations: Vec<Option<String>>,
    /// Set when the whole batch failed
    pub failure: Option<TranslationError>,
    /// Wall-clock duration of the backend call (zero when no call was made)
    pub elapsed: Duration,
}

impl BatchOutcome {
    fn failed(len: usize, failure: TranslationError, elapsed: Duration) -> Self {
        Self {
            translations: vec![None; len],
            failure: Some(failure),
            elapsed,
        }
    }

    /// Whether the batch failed as a whole
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// Number of slots that carry a translation
    pub fn translated_count(&self) -> usize {
        self.translations.iter().filter(|t| t.is_some()).count()
    }
}

/// Sends bounded, ordered batches to an MT backend
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// The backend to call
    backend: Arc<dyn TranslationBackend>,
    /// Locale -> backend tag table
    languages: LanguageMap,
    /// Fixed source locale
    source_language: String,
    /// Largest batch the caller may send
    max_batch_size: usize,
    /// Bound on a single backend call
    call_timeout: Duration,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        languages: LanguageMap,
        source_language: impl Into<String>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            backend,
            languages,
            source_language: source_language.into(),
            max_batch_size: max_batch_size.max(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the bound on a single backend call
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Largest batch this translator accepts
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// The language table in use
    pub fn languages(&self) -> &LanguageMap {
        &self.languages
    }

    /// The fixed source locale
    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// Name of the wrapped backend
    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    /// Check the backend connection
    pub async fn check_connection(&self) -> Result<(), ProviderError> {
        self.backend.check_connection().await
    }

    /// Whether `target_language` can be translated to
    pub fn supports(&self, target_language: &str) -> bool {
        self.languages.supports(target_language)
    }

    /// Translate `texts` into `target_language`
    ///
    /// The outcome always has `texts.len()` slots. An unmapped language fails
    /// without contacting the backend. Backend errors, timeouts and responses
    /// of an unexpected shape fail every slot. Inputs longer than the
    /// configured maximum are the caller's mistake and fail the same way.
    pub async fn translate(&self, texts: &[String], target_language: &str) -> BatchOutcome {
        if texts.is_empty() {
            return BatchOutcome {
                translations: Vec::new(),
                failure: None,
                elapsed: Duration::ZERO,
            };
        }

        let Some(target_tag) = self.languages.backend_tag(target_language) else {
            warn!("No backend language tag for '{}', batch skipped", target_language);
            return BatchOutcome::failed(
                texts.len(),
                TranslationError::UnsupportedLanguage(target_language.to_string()),
                Duration::ZERO,
            );
        };

        let Some(source_tag) = self.languages.backend_tag(&self.source_language) else {
            warn!("No backend language tag for source '{}', batch skipped", self.source_language);
            return BatchOutcome::failed(
                texts.len(),
                TranslationError::UnsupportedLanguage(self.source_language.clone()),
                Duration::ZERO,
            );
        };

        if texts.len() > self.max_batch_size {
            return BatchOutcome::failed(
                texts.len(),
                TranslationError::BatchTooLarge {
                    size: texts.len(),
                    max: self.max_batch_size,
                },
                Duration::ZERO,
            );
        }

        debug!(
            "Sending {} item(s) to {} ({} -> {})",
            texts.len(),
            self.backend.backend_name(),
            source_tag,
            target_tag
        );

        let start = Instant::now();
        let result = tokio::time::timeout(
            self.call_timeout,
            self.backend.translate_batch(texts, source_tag, target_tag),
        )
        .await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(translations)) if translations.len() != texts.len() => {
                let e = ProviderError::LengthMismatch {
                    expected: texts.len(),
                    actual: translations.len(),
                };
                error!("{} batch call failed: {}", self.backend.backend_name(), e);
                BatchOutcome::failed(texts.len(), TranslationError::Backend(e), elapsed)
            }
            Ok(Ok(translations)) => BatchOutcome {
                translations,
                failure: None,
                elapsed,
            },
            Ok(Err(e)) => {
                error!("{} batch call failed: {}", self.backend.backend_name(), e);
                BatchOutcome::failed(texts.len(), TranslationError::Backend(e), elapsed)
            }
            Err(_) => {
                let e = ProviderError::Timeout(self.call_timeout.as_secs());
                error!("{} batch call failed: {}", self.backend.backend_name(), e);
                BatchOutcome::failed(texts.len(), TranslationError::Backend(e), elapsed)
            }
        }
    }
}
