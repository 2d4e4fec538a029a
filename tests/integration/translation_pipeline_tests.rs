/*!
 * End-to-end tests for the cache-first translation pipeline
 */

use std::sync::Arc;
use tmflow::database::{ConflictPolicy, InsertOutcome, Repository};
use tmflow::providers::mock::MockProvider;
use tmflow::language_utils::LanguageMap;
use tmflow::translation::{
    BatchTranslator, InMemoryMemory, RunMetrics, Segment, SqliteMemory, TranslationMemory, TranslationPipeline,
};
use crate::common::TruncatingBackend;
use crate::common;

/// Test that every batch size produces the same, ordered result
#[tokio::test]
async fn test_run_withAnyBatchSize_shouldPreserveOrder() {
    let expected: Vec<Option<String>> = (0..23)
        .map(|i| Some(MockProvider::expected_translation(&format!("Segment {}", i), "fr_XX")))
        .collect();

    for batch_size in [1, 2, 5, 7, 22, 23, 100] {
        let provider = MockProvider::working();
        let (pipeline, _memory) = common::in_memory_pipeline(&provider, batch_size);

        let mut segments = common::numbered_segments(23);
        let report = pipeline.run(&mut segments, "fr-FR", &mut RunMetrics::new()).await;

        assert_eq!(common::targets(&segments), expected, "batch size {}", batch_size);
        assert_eq!(report.batches, 23usize.div_ceil(batch_size));
        assert!(provider.received_batches().iter().all(|b| b.len() <= batch_size));

        // Batches are consecutive runs of the pending segments
        let sent: Vec<String> = provider.received_batches().concat();
        let sources: Vec<String> = segments.iter().map(|s| s.source.clone()).collect();
        assert_eq!(sent, sources);
    }
}

/// Test that a second run over the same input is served entirely from memory
#[tokio::test]
async fn test_run_twice_shouldBeIdempotent() {
    let provider = MockProvider::working();
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 4);

    let mut first = common::numbered_segments(10);
    pipeline.run(&mut first, "de-DE", &mut RunMetrics::new()).await;
    let calls_after_first = provider.call_count();
    let inserts_after_first = memory.insert_count();

    let mut second = common::numbered_segments(10);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut second, "de-DE", &mut metrics).await;

    assert_eq!(common::targets(&first), common::targets(&second));
    assert_eq!(provider.call_count(), calls_after_first);
    assert_eq!(memory.insert_count(), inserts_after_first);
    assert_eq!(report.cached, 10);
    assert_eq!(metrics.snapshot().total_tm_hits, 10);
    assert_eq!(metrics.snapshot().hit_rate, 1.0);
}

/// Test that a failed call leaves its batch untranslated and stores nothing
#[tokio::test]
async fn test_run_withFailingBackend_shouldLeaveBatchUntouched() {
    common::init_test_logging();
    let provider = MockProvider::failing();
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 5);

    let mut segments = common::numbered_segments(5);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "fr-FR", &mut metrics).await;

    assert!(segments.iter().all(|s| s.target.is_none()));
    assert_eq!(memory.insert_count(), 0);
    assert!(memory.is_empty());
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.skipped, 5);
    assert!(!report.is_complete());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.skipped, 5);
    assert_eq!(snapshot.total_nmt_calls, 0);
    assert_eq!(snapshot.failed_batches, 1);
    assert_eq!(snapshot.mean_nmt_latency_secs, None);
}

/// Test that an unmapped language never contacts the backend or the store writer
#[tokio::test]
async fn test_run_withUnsupportedLanguage_shouldSkipEverything() {
    let provider = MockProvider::working();
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 5);

    let mut segments = common::numbered_segments(7);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "tlh-QO", &mut metrics).await;

    assert_eq!(provider.call_count(), 0);
    assert_eq!(memory.insert_count(), 0);
    assert!(segments.iter().all(|s| s.target.is_none()));
    assert_eq!(report.skipped, 7);
    assert_eq!(report.batches, 0);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_segments, 7);
    assert_eq!(snapshot.skipped, 7);
}

/// Test that empty and whitespace-only segments are excluded from everything
#[tokio::test]
async fn test_run_withEmptySegments_shouldExcludeThem() {
    let provider = MockProvider::working();
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 10);

    let mut segments = Segment::from_pairs(vec![("a", "Hello"), ("b", ""), ("c", "   \t"), ("d", "World")]);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "es-ES", &mut metrics).await;

    assert_eq!(provider.received_batches(), vec![vec!["Hello".to_string(), "World".to_string()]]);
    assert_eq!(memory.lookup_count(), 2);
    assert_eq!(segments[1].target, None);
    assert_eq!(segments[2].target, None);
    assert_eq!(report.malformed, 2);
    assert_eq!(report.translated, 2);
    assert_eq!(metrics.snapshot().total_segments, 2);
}

/// Test accounting: hits, MT translations and skips always add up to the segments seen
#[tokio::test]
async fn test_run_metrics_shouldAccountForEverySegment() {
    let provider = MockProvider::dropping_items(3);
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 4);
    memory.seed("Segment 0", "it-IT", "Segmento 0");
    memory.seed("Segment 5", "it-IT", "Segmento 5");

    let mut segments = common::numbered_segments(12);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "it-IT", &mut metrics).await;

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_segments, 12);
    assert_eq!(
        snapshot.total_tm_hits + snapshot.total_nmt_calls + snapshot.skipped,
        snapshot.total_segments
    );
    assert_eq!(snapshot.total_tm_hits, 2);
    assert_eq!(snapshot.latency_samples.len(), snapshot.total_nmt_calls);
    assert_eq!(report.cached, 2);
    assert_eq!(report.translated, snapshot.total_nmt_calls);
    assert_eq!(report.skipped, snapshot.skipped);

    // 10 pending items in batches of 4, 4, 2; every third item of a batch is dropped
    assert_eq!(report.batches, 3);
    assert_eq!(report.skipped, 2);
}

/// Test a mixed document: 120 segments, 50 already known, batches of 20
#[tokio::test]
async fn test_run_withPartiallyCachedDocument_shouldBatchOnlyMisses() {
    common::init_test_logging();
    let provider = MockProvider::working();
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 20);

    for i in (0..120).filter(|i| i % 12 < 5) {
        memory.seed(&format!("Segment {}", i), "fr-FR", &format!("Segment {} (fr)", i));
    }
    assert_eq!(memory.len(), 50);

    let mut segments = common::numbered_segments(120);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "fr-FR", &mut metrics).await;

    let sizes: Vec<usize> = provider.received_batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![20, 20, 20, 10]);
    assert_eq!(report.cached, 50);
    assert_eq!(report.translated, 70);
    assert_eq!(memory.len(), 120);
    assert!(segments.iter().all(|s| s.is_translated()));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_segments, 120);
    assert_eq!(snapshot.total_tm_hits, 50);
    assert_eq!(snapshot.total_nmt_calls, 70);
    assert_eq!(snapshot.batches, 4);

    // Second pass: all from memory, no calls
    let calls = provider.call_count();
    let mut again = common::numbered_segments(120);
    let mut metrics = RunMetrics::new();
    pipeline.run(&mut again, "fr-FR", &mut metrics).await;

    assert_eq!(provider.call_count(), calls);
    assert_eq!(metrics.snapshot().total_tm_hits, 120);
    assert_eq!(common::targets(&again), common::targets(&segments));
}

/// Same scenario against the SQLite store
#[tokio::test]
async fn test_run_withSqliteMemory_shouldPersistNewTranslations() {
    let repository = Repository::new_in_memory().expect("in-memory repository");
    let memory = SqliteMemory::new(repository.clone(), ConflictPolicy::Overwrite);
    for i in 0..50 {
        memory
            .insert(&format!("Segment {}", i), "fr-FR", &format!("Segment {} (fr)", i))
            .await
            .unwrap();
    }

    let provider = MockProvider::working();
    let pipeline = common::test_pipeline(&provider, Arc::new(memory), 20);

    let mut segments = common::numbered_segments(120);
    let report = pipeline.run(&mut segments, "fr-FR", &mut RunMetrics::new()).await;

    assert_eq!(report.cached, 50);
    assert_eq!(report.translated, 70);
    assert_eq!(provider.call_count(), 4);
    assert_eq!(segments[0].target.as_deref(), Some("Segment 0 (fr)"));
    assert_eq!(segments[50].target.as_deref(), Some("[fr_XX] Segment 50"));

    let stats = repository.stats().await.unwrap();
    assert_eq!(stats.total_entries, 120);

    let mut again = common::numbered_segments(120);
    let mut metrics = RunMetrics::new();
    pipeline.run(&mut again, "fr-FR", &mut metrics).await;
    assert_eq!(provider.call_count(), 4);
    assert_eq!(metrics.snapshot().total_tm_hits, 120);
}

/// Test that a failed batch does not stop later batches
#[tokio::test]
async fn test_run_withIntermittentBackend_shouldContinueAfterFailure() {
    common::init_test_logging();
    let provider = MockProvider::intermittent(2);
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 3);

    let mut segments = common::numbered_segments(9);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "nl-NL", &mut metrics).await;

    // Calls 1 and 3 succeed, call 2 fails
    assert_eq!(provider.call_count(), 3);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.translated, 6);
    assert_eq!(report.skipped, 3);
    assert!(segments[0..3].iter().all(|s| s.is_translated()));
    assert!(segments[3..6].iter().all(|s| s.target.is_none()));
    assert!(segments[6..9].iter().all(|s| s.is_translated()));
    assert_eq!(memory.len(), 6);
}

/// Test that a store write failure keeps the translation in the document
#[tokio::test]
async fn test_run_withFailingInserts_shouldKeepTranslations() {
    let provider = MockProvider::working();
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 10);
    memory.set_fail_inserts(true);

    let mut segments = common::numbered_segments(3);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "pl-PL", &mut metrics).await;

    assert!(segments.iter().all(|s| s.is_translated()));
    assert_eq!(report.translated, 3);
    assert_eq!(report.cache_write_failures, 3);
    assert_eq!(metrics.snapshot().cache_write_failures, 3);
    assert!(memory.is_empty());
}

/// Test that a failing lookup degrades to a miss
#[tokio::test]
async fn test_run_withFailingLookups_shouldTranslateAnyway() {
    let provider = MockProvider::working();
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 10);
    memory.seed("Segment 0", "sv-SE", "Segment 0 (sv)");
    memory.set_fail_lookups(true);

    let mut segments = common::numbered_segments(2);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "sv-SE", &mut metrics).await;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(report.cached, 0);
    assert_eq!(report.translated, 2);
    assert_eq!(metrics.snapshot().cache_lookup_failures, 2);
    assert_eq!(segments[0].target.as_deref(), Some("[sv_SE] Segment 0"));
}

/// Test that blank backend output counts as untranslated
#[tokio::test]
async fn test_run_withBlankTranslations_shouldSkipThem() {
    let provider = MockProvider::working().with_custom_translation(|text, _| {
        if text.ends_with('1') { "   ".to_string() } else { format!("<{}>", text) }
    });
    let (pipeline, memory) = common::in_memory_pipeline(&provider, 10);

    let mut segments = common::numbered_segments(3);
    let report = pipeline.run(&mut segments, "ru-RU", &mut RunMetrics::new()).await;

    assert_eq!(
        common::targets(&segments),
        vec![Some("<Segment 0>".to_string()), None, Some("<Segment 2>".to_string())]
    );
    assert_eq!(report.skipped, 1);
    assert_eq!(memory.get("Segment 1", "ru-RU"), None);
}

/// Test the keep-existing policy leaves the stored text alone across runs
#[tokio::test]
async fn test_run_withKeepExistingPolicy_shouldNotOverwrite() {
    let memory = InMemoryMemory::with_policy(ConflictPolicy::KeepExisting);
    memory.seed("Segment 0", "ja-JP", "old");

    let outcome = memory.insert("Segment 0", "ja-JP", "new").await.unwrap();
    assert_eq!(outcome, InsertOutcome::Unchanged);

    let provider = MockProvider::working();
    let pipeline = common::test_pipeline(&provider, Arc::new(memory.clone()), 10);
    let mut segments = common::numbered_segments(1);
    pipeline.run(&mut segments, "ja-JP", &mut RunMetrics::new()).await;

    assert_eq!(segments[0].target.as_deref(), Some("old"));
    assert_eq!(provider.call_count(), 0);
}

/// Test that a backend answering too few items cannot break the accounting
#[tokio::test]
async fn test_run_withShortBackendResponse_shouldCountEverySegment() {
    let memory = InMemoryMemory::new();
    let translator = BatchTranslator::new(Arc::new(TruncatingBackend), LanguageMap::mbart50(), "en-US", 10);
    let pipeline = TranslationPipeline::new(Arc::new(memory.clone()), translator);

    let mut segments = common::numbered_segments(3);
    let mut metrics = RunMetrics::new();
    let report = pipeline.run(&mut segments, "fr-FR", &mut metrics).await;

    assert_eq!(report.translated, 0);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(common::targets(&segments), vec![None, None, None]);
    assert_eq!(memory.insert_count(), 0);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_segments, 3);
    assert_eq!(snapshot.total_tm_hits + snapshot.total_nmt_calls + snapshot.skipped, 3);
}
