/*!
 * Cache-first batch translation pipeline.
 *
 * For one document and one target language the pipeline:
 * 1. serves every segment it can from the translation memory, in order
 * 2. sends the remaining segments to the backend in consecutive bounded batches
 * 3. writes each returned translation into its segment and into the memory
 *
 * Failures stay local: a failed batch leaves its own segments untranslated and
 * the next batch is still attempted. Results are routed back through the slot
 * each batch item carries, never by recomputing positions.
 */

use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::language_utils::normalize_locale;
use crate::translation::batch::BatchTranslator;
use crate::translation::memory::{truncate_text, TranslationMemory};
use crate::translation::metrics::RunMetrics;
use crate::translation::segment::{into_batches, BatchItem, Segment};

/// What happened to one document's segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    /// Segments served from translation memory
    pub cached: usize,
    /// Segments translated by the backend
    pub translated: usize,
    /// Segments left untranslated
    pub skipped: usize,
    /// Empty or whitespace-only segments, never processed
    pub malformed: usize,
    /// Backend calls made
    pub batches: usize,
    /// Backend calls that failed as a whole
    pub failed_batches: usize,
    /// Translations that could not be stored
    pub cache_write_failures: usize,
}

impl DocumentReport {
    /// Segments that now carry a target text
    pub fn completed(&self) -> usize {
        self.cached + self.translated
    }

    /// Whether every well-formed segment was translated
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }
}

/// Orchestrates translation memory and backend for one document at a time
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    /// Translation memory, shared across documents
    memory: Arc<dyn TranslationMemory>,
    /// Backend wrapper; its batch cap is the pipeline's batch size
    translator: BatchTranslator,
}

impl TranslationPipeline {
    /// Create a pipeline
    pub fn new(memory: Arc<dyn TranslationMemory>, translator: BatchTranslator) -> Self {
        Self { memory, translator }
    }

    /// Configured batch size
    pub fn batch_size(&self) -> usize {
        self.translator.max_batch_size()
    }

    /// The batch translator in use
    pub fn translator(&self) -> &BatchTranslator {
        &self.translator
    }

    /// Translate `segments` into `target_language`, filling their targets in place
    ///
    /// Every well-formed segment is recorded in `metrics` exactly once.
    /// Malformed segments are left alone and not recorded.
    pub async fn run(
        &self,
        segments: &mut [Segment],
        target_language: &str,
        metrics: &mut RunMetrics,
    ) -> DocumentReport {
        let target_language = normalize_locale(target_language);
        let mut report = DocumentReport::default();

        let mut candidates = Vec::with_capacity(segments.len());
        for (slot, segment) in segments.iter().enumerate() {
            if segment.is_malformed() {
                debug!("Skipping empty segment '{}'", segment.id);
                report.malformed += 1;
            } else {
                candidates.push(slot);
            }
        }

        if !self.translator.supports(&target_language) {
            warn!(
                "Target language '{}' has no backend mapping; {} segment(s) left untranslated",
                target_language,
                candidates.len()
            );
            for _ in &candidates {
                metrics.record_segment(false, None);
            }
            report.skipped = candidates.len();
            return report;
        }

        let pending = self
            .cache_phase(segments, &candidates, &target_language, metrics, &mut report)
            .await;

        self.batch_phase(segments, pending, &target_language, metrics, &mut report)
            .await;

        info!(
            "{}: {} from memory, {} translated, {} skipped",
            target_language, report.cached, report.translated, report.skipped
        );

        report
    }

    async fn cache_phase(
        &self,
        segments: &mut [Segment],
        candidates: &[usize],
        target_language: &str,
        metrics: &mut RunMetrics,
        report: &mut DocumentReport,
    ) -> Vec<BatchItem> {
        let mut pending = Vec::new();

        for &slot in candidates {
            let segment = &mut segments[slot];
            let key = segment.key().to_string();

            match self.memory.lookup(&key, target_language).await {
                Ok(Some(translation)) => {
                    debug!("Memory hit for '{}'", truncate_text(&key, 30));
                    segment.target = Some(translation);
                    metrics.record_segment(true, None);
                    report.cached += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Lookup failed for segment '{}', treating as miss: {}", segment.id, e);
                    metrics.record_cache_lookup_failure();
                }
            }

            pending.push(BatchItem {
                slot,
                id: segment.id.clone(),
                source: key,
            });
        }

        pending
    }

    async fn batch_phase(
        &self,
        segments: &mut [Segment],
        pending: Vec<BatchItem>,
        target_language: &str,
        metrics: &mut RunMetrics,
        report: &mut DocumentReport,
    ) {
        let batches = into_batches(pending, self.batch_size());
        let total_batches = batches.len();

        for batch in batches {
            let outcome = self.translator.translate(&batch.texts(), target_language).await;

            metrics.record_batch(!outcome.is_failure());
            report.batches += 1;

            if let Some(failure) = &outcome.failure {
                report.failed_batches += 1;
                warn!(
                    "Batch {}/{} ({} segments) left untranslated: {}",
                    batch.index + 1,
                    total_batches,
                    batch.len(),
                    failure
                );
            } else {
                info!(
                    "Batch {}/{} translated in {:.2?}",
                    batch.index + 1,
                    total_batches,
                    outcome.elapsed
                );
            }

            // Approximation: the call's duration spread evenly over its items
            let per_item_latency = outcome.elapsed.as_secs_f64() / batch.len() as f64;

            for (item, translation) in batch.items.iter().zip(outcome.translations) {
                let Some(translation) = translation.filter(|t| !t.trim().is_empty()) else {
                    debug!("No translation for segment '{}'", item.id);
                    metrics.record_segment(false, None);
                    report.skipped += 1;
                    continue;
                };

                if let Err(e) = self.memory.insert(&item.source, target_language, &translation).await {
                    warn!("Could not store translation of segment '{}': {}", item.id, e);
                    metrics.record_cache_write_failure();
                    report.cache_write_failures += 1;
                }

                segments[item.slot].target = Some(translation);
                metrics.record_segment(false, Some(per_item_latency));
                report.translated += 1;
            }
        }
    }
}
