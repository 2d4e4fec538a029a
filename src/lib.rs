/*!
 * # tmflow - cache-first batch translation of XLIFF documents
 *
 * A Rust library for translating bilingual resource documents through a
 * persistent translation memory and a machine-translation backend.
 *
 * ## Features
 *
 * - Serve previously translated segments from a SQLite translation memory
 * - Translate the remaining segments in bounded, ordered batches:
 *   - Hugging Face hosted inference (mBART-50 style models)
 *   - Self-hosted translation servers
 * - Explicit conflict policy for translation memory writes
 * - Per-document run metrics (hit rate, call count, latency, throughput)
 * - XLIFF 1.2 reading and in-place target rewriting
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `translation`: The cache-first pipeline:
 *   - `translation::segment`: Segments and batches
 *   - `translation::memory`: Translation memory stores
 *   - `translation::batch`: Batch calls to the MT backend
 *   - `translation::metrics`: Run metrics and sinks
 *   - `translation::pipeline`: Orchestration for one document
 * - `providers`: MT backend clients
 * - `database`: SQLite persistence for the translation memory
 * - `document`: XLIFF adapter
 * - `app_config`: Configuration management
 * - `app_controller`: Folder driver
 * - `file_utils`: File system operations
 * - `language_utils`: Locale codes and the backend language table
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::XliffDocument;
pub use errors::{AppError, CacheError, DocumentError, ProviderError, TranslationError};
pub use language_utils::{normalize_locale, LanguageMap};
pub use translation::{BatchTranslator, RunMetrics, RunMetricsSnapshot, Segment, TranslationPipeline};
