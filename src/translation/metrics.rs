/*!
 * Run metrics.
 *
 * `RunMetrics` accumulates per-segment outcomes and per-batch latency for one
 * pipeline run. `snapshot()` derives the aggregate view:
 * - Counts: segments seen, translation memory hits, MT-translated, skipped
 * - Latency: mean over segments that carried a latency estimate
 * - Throughput: segments per hour of wall-clock time since creation
 *
 * Snapshots are handed to `MetricsSink`s. A sink that fails is logged and
 * ignored; metrics never fail a run.
 */

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Accumulator of one run's segment and batch outcomes
#[derive(Debug, Clone)]
pub struct RunMetrics {
    started: Instant,
    total_segments: usize,
    tm_hits: usize,
    nmt_calls: usize,
    skipped: usize,
    batches: usize,
    failed_batches: usize,
    cache_lookup_failures: usize,
    cache_write_failures: usize,
    latency_samples: Vec<f64>,
}

impl RunMetrics {
    /// Start a new accumulator; elapsed time is measured from here
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            total_segments: 0,
            tm_hits: 0,
            nmt_calls: 0,
            skipped: 0,
            batches: 0,
            failed_batches: 0,
            cache_lookup_failures: 0,
            cache_write_failures: 0,
            latency_samples: Vec::new(),
        }
    }

    /// Record one segment outcome
    ///
    /// A cache hit ignores `nmt_latency_secs`. A miss with a latency counts as
    /// MT-translated and contributes a latency sample; a miss without one
    /// counts as skipped.
    pub fn record_segment(&mut self, was_cache_hit: bool, nmt_latency_secs: Option<f64>) {
        self.total_segments += 1;

        match (was_cache_hit, nmt_latency_secs) {
            (true, _) => self.tm_hits += 1,
            (false, Some(latency)) => {
                self.nmt_calls += 1;
                self.latency_samples.push(latency);
            }
            (false, None) => self.skipped += 1,
        }
    }

    /// Record one backend call
    pub fn record_batch(&mut self, succeeded: bool) {
        self.batches += 1;
        if !succeeded {
            self.failed_batches += 1;
        }
    }

    /// Record a lookup that failed and was treated as a miss
    pub fn record_cache_lookup_failure(&mut self) {
        self.cache_lookup_failures += 1;
    }

    /// Record a translation that could not be stored
    pub fn record_cache_write_failure(&mut self) {
        self.cache_write_failures += 1;
    }

    /// Time since the accumulator was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Aggregate view of everything recorded so far
    pub fn snapshot(&self) -> RunMetricsSnapshot {
        let elapsed_secs = self.elapsed().as_secs_f64();

        let mean_nmt_latency_secs = if self.latency_samples.is_empty() {
            None
        } else {
            Some(self.latency_samples.iter().sum::<f64>() / self.latency_samples.len() as f64)
        };

        let throughput_per_hour = if elapsed_secs > 0.0 {
            self.total_segments as f64 / (elapsed_secs / 3600.0)
        } else {
            0.0
        };

        let hit_rate = if self.total_segments > 0 {
            self.tm_hits as f64 / self.total_segments as f64
        } else {
            0.0
        };

        RunMetricsSnapshot {
            total_segments: self.total_segments,
            total_tm_hits: self.tm_hits,
            total_nmt_calls: self.nmt_calls,
            skipped: self.skipped,
            batches: self.batches,
            failed_batches: self.failed_batches,
            cache_lookup_failures: self.cache_lookup_failures,
            cache_write_failures: self.cache_write_failures,
            latency_samples: self.latency_samples.clone(),
            mean_nmt_latency_secs,
            elapsed_secs,
            throughput_per_hour,
            hit_rate,
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable aggregate of a run's metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetricsSnapshot {
    /// Segments seen (malformed segments excluded)
    pub total_segments: usize,
    /// Segments served from translation memory
    pub total_tm_hits: usize,
    /// Segments translated by the backend, counted per segment
    pub total_nmt_calls: usize,
    /// Segments left untranslated
    pub skipped: usize,
    /// Backend calls made
    pub batches: usize,
    /// Backend calls that failed as a whole
    pub failed_batches: usize,
    /// Lookups that failed and degraded to a miss
    pub cache_lookup_failures: usize,
    /// Translations that could not be stored
    pub cache_write_failures: usize,
    /// Per-segment latency estimates (batch duration / batch size)
    #[serde(skip)]
    pub latency_samples: Vec<f64>,
    /// Mean over `latency_samples`
    pub mean_nmt_latency_secs: Option<f64>,
    /// Wall-clock seconds since the metrics were created
    pub elapsed_secs: f64,
    /// `total_segments / elapsed hours`
    pub throughput_per_hour: f64,
    /// `total_tm_hits / total_segments`
    pub hit_rate: f64,
}

impl fmt::Display for RunMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} segments: {} from memory, {} translated, {} skipped ({} batches, {} failed) in {:.2}s",
            self.total_segments,
            self.total_tm_hits,
            self.total_nmt_calls,
            self.skipped,
            self.batches,
            self.failed_batches,
            self.elapsed_secs
        )?;
        if let Some(mean) = self.mean_nmt_latency_secs {
            write!(f, ", {:.3}s/segment", mean)?;
        }
        Ok(())
    }
}

/// Totals over several documents of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunTotals {
    /// Documents processed
    pub documents: usize,
    /// Segments seen
    pub total_segments: usize,
    /// Translation memory hits
    pub total_tm_hits: usize,
    /// MT-translated segments
    pub total_nmt_calls: usize,
    /// Skipped segments
    pub skipped: usize,
    /// Backend calls
    pub batches: usize,
    /// Failed backend calls
    pub failed_batches: usize,
    /// Failed translation memory writes
    pub cache_write_failures: usize,
}

impl RunTotals {
    /// Fold one document's snapshot into the totals
    pub fn add(&mut self, snapshot: &RunMetricsSnapshot) {
        self.documents += 1;
        self.total_segments += snapshot.total_segments;
        self.total_tm_hits += snapshot.total_tm_hits;
        self.total_nmt_calls += snapshot.total_nmt_calls;
        self.skipped += snapshot.skipped;
        self.batches += snapshot.batches;
        self.failed_batches += snapshot.failed_batches;
        self.cache_write_failures += snapshot.cache_write_failures;
    }
}

impl fmt::Display for RunTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} document(s), {} segments: {} from memory, {} translated, {} skipped, {} backend call(s) ({} failed)",
            self.documents,
            self.total_segments,
            self.total_tm_hits,
            self.total_nmt_calls,
            self.skipped,
            self.batches,
            self.failed_batches
        )
    }
}

/// Destination for metrics snapshots
pub trait MetricsSink: Send + Sync {
    /// Forward one snapshot, labelled with the document it describes
    fn emit(&self, label: &str, snapshot: &RunMetricsSnapshot) -> Result<()>;
}

/// Sink that writes the snapshot to the log as one JSON line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn emit(&self, label: &str, snapshot: &RunMetricsSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).context("Failed to serialize metrics")?;
        info!("METRICS SUMMARY ({}): {}", label, json);
        Ok(())
    }
}

#[derive(Serialize)]
struct MetricsRecord<'a> {
    run_id: &'a str,
    timestamp: String,
    document: &'a str,
    #[serde(flatten)]
    snapshot: &'a RunMetricsSnapshot,
}

/// Sink that appends one JSON object per snapshot to a file
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    run_id: String,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open (or create) `path` for appending
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open metrics file: {}", path.display()))?;

        Ok(Self {
            path,
            run_id: Uuid::new_v4().to_string(),
            file: Mutex::new(file),
        })
    }

    /// Identifier stamped on every record written by this sink
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// File being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonLinesSink {
    fn emit(&self, label: &str, snapshot: &RunMetricsSnapshot) -> Result<()> {
        let record = MetricsRecord {
            run_id: &self.run_id,
            timestamp: Utc::now().to_rfc3339(),
            document: label,
            snapshot,
        };
        let line = serde_json::to_string(&record).context("Failed to serialize metrics")?;

        let mut file = self.file.lock();
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write metrics file: {}", self.path.display()))?;
        Ok(())
    }
}

/// Emit to every sink, logging and ignoring failures
pub fn emit_all(sinks: &[Box<dyn MetricsSink>], label: &str, snapshot: &RunMetricsSnapshot) {
    for sink in sinks {
        if let Err(e) = sink.emit(label, snapshot) {
            warn!("Metrics sink failed for {}: {:#}", label, e);
        }
    }
}
