/*!
 * Cache-first batch translation.
 *
 * This module contains the core of tmflow, split into several submodules:
 *
 * - `segment`: Segments and the batches built from them
 * - `memory`: Translation memory stores
 * - `batch`: Bounded, ordered calls to the MT backend
 * - `metrics`: Run metrics and their sinks
 * - `pipeline`: Orchestration of memory, backend and metrics for one document
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOutcome, BatchTranslator};
pub use self::memory::{InMemoryMemory, SqliteMemory, TranslationMemory};
pub use self::metrics::{JsonLinesSink, LogSink, MetricsSink, RunMetrics, RunMetricsSnapshot, RunTotals};
pub use self::pipeline::{DocumentReport, TranslationPipeline};
pub use self::segment::{Batch, BatchItem, Segment};

// Submodules
pub mod batch;
pub mod memory;
pub mod metrics;
pub mod pipeline;
pub mod segment;
