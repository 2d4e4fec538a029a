/*!
 * Tests for run metrics and metrics sinks
 */

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use tmflow::translation::metrics::emit_all;
use tmflow::translation::{JsonLinesSink, LogSink, MetricsSink, RunMetrics, RunMetricsSnapshot, RunTotals};
use crate::common;

/// Sink that remembers every label it was given
#[derive(Default, Clone)]
struct RecordingSink {
    labels: Arc<Mutex<Vec<String>>>,
}

impl MetricsSink for RecordingSink {
    fn emit(&self, label: &str, _snapshot: &RunMetricsSnapshot) -> Result<()> {
        self.labels.lock().push(label.to_string());
        Ok(())
    }
}

/// Sink that always fails
struct BrokenSink;

impl MetricsSink for BrokenSink {
    fn emit(&self, _label: &str, _snapshot: &RunMetricsSnapshot) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}

#[test]
fn test_snapshot_withNoSegments_shouldHaveZeroRates() {
    let snapshot = RunMetrics::new().snapshot();

    assert_eq!(snapshot.total_segments, 0);
    assert_eq!(snapshot.hit_rate, 0.0);
    assert_eq!(snapshot.mean_nmt_latency_secs, None);
    assert!(snapshot.latency_samples.is_empty());
}

#[test]
fn test_snapshot_shouldAverageLatencyOverTranslatedSegments() {
    let mut metrics = RunMetrics::new();
    for _ in 0..3 {
        metrics.record_segment(true, None);
    }
    metrics.record_segment(false, Some(0.2));
    metrics.record_segment(false, Some(0.4));
    metrics.record_segment(false, None);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_segments, 6);
    assert_eq!(snapshot.total_tm_hits, 3);
    assert_eq!(snapshot.total_nmt_calls, 2);
    assert_eq!(snapshot.skipped, 1);
    assert_eq!(snapshot.latency_samples, vec![0.2, 0.4]);
    assert!((snapshot.mean_nmt_latency_secs.unwrap() - 0.3).abs() < 1e-9);
    assert!((snapshot.hit_rate - 0.5).abs() < 1e-9);
    assert!(snapshot.throughput_per_hour >= 0.0);
}

#[test]
fn test_snapshot_shouldCountBatchesAndCacheFailures() {
    let mut metrics = RunMetrics::new();
    metrics.record_batch(true);
    metrics.record_batch(false);
    metrics.record_batch(true);
    metrics.record_cache_lookup_failure();
    metrics.record_cache_write_failure();
    metrics.record_cache_write_failure();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.batches, 3);
    assert_eq!(snapshot.failed_batches, 1);
    assert_eq!(snapshot.cache_lookup_failures, 1);
    assert_eq!(snapshot.cache_write_failures, 2);
}

#[test]
fn test_snapshotJson_shouldOmitRawSamples() -> Result<()> {
    let mut metrics = RunMetrics::new();
    metrics.record_segment(false, Some(0.25));

    let json = serde_json::to_value(metrics.snapshot())?;
    assert!(json.get("latency_samples").is_none());
    assert_eq!(json["total_nmt_calls"], 1);
    assert_eq!(json["mean_nmt_latency_secs"], 0.25);
    Ok(())
}

#[test]
fn test_runTotals_shouldSumSnapshots() {
    let mut first = RunMetrics::new();
    first.record_segment(true, None);
    first.record_segment(false, Some(0.1));
    first.record_batch(true);

    let mut second = RunMetrics::new();
    second.record_segment(false, None);
    second.record_batch(false);

    let mut totals = RunTotals::default();
    totals.add(&first.snapshot());
    totals.add(&second.snapshot());

    assert_eq!(totals.documents, 2);
    assert_eq!(totals.total_segments, 3);
    assert_eq!(totals.total_tm_hits, 1);
    assert_eq!(totals.total_nmt_calls, 1);
    assert_eq!(totals.skipped, 1);
    assert_eq!(totals.batches, 2);
    assert_eq!(totals.failed_batches, 1);
    assert!(totals.to_string().starts_with("2 document(s), 3 segments"));
}

#[test]
fn test_jsonLinesSink_shouldAppendOneRecordPerEmit() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out/metrics.jsonl");

    let sink = JsonLinesSink::open(&path)?;
    let mut metrics = RunMetrics::new();
    metrics.record_segment(true, None);
    let snapshot = metrics.snapshot();

    sink.emit("a.xlf", &snapshot)?;
    sink.emit("b.xlf", &snapshot)?;

    let content = fs::read_to_string(&path)?;
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["document"], "a.xlf");
    assert_eq!(records[1]["document"], "b.xlf");
    assert_eq!(records[0]["run_id"], sink.run_id());
    assert_eq!(records[0]["total_tm_hits"], 1);
    assert!(records[0]["timestamp"].as_str().is_some());
    Ok(())
}

#[test]
fn test_emitAll_withFailingSink_shouldStillReachOthers() {
    let recording = RecordingSink::default();
    let sinks: Vec<Box<dyn MetricsSink>> = vec![
        Box::new(BrokenSink),
        Box::new(LogSink),
        Box::new(recording.clone()),
    ];

    emit_all(&sinks, "doc.xlf", &RunMetrics::new().snapshot());

    assert_eq!(*recording.labels.lock(), vec!["doc.xlf".to_string()]);
}
