use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{BackendType, Config};
use crate::database::{DatabaseConnection, Repository};
use crate::document::XliffDocument;
use crate::file_utils::FileManager;
use crate::language_utils::{self, normalize_locale};
use crate::providers::huggingface::HuggingFace;
use crate::providers::self_hosted::SelfHosted;
use crate::providers::TranslationBackend;
use crate::translation::metrics::emit_all;
use crate::translation::{
    BatchTranslator, DocumentReport, JsonLinesSink, LogSink, MetricsSink, RunMetrics, RunMetricsSnapshot,
    RunTotals, SqliteMemory, TranslationMemory, TranslationPipeline,
};

// @module: Application controller for document translation

/// Options for one translation run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Target locale for every document, overriding all other sources
    pub target_language: Option<String>,
    /// Directory receiving translated documents; in place when unset
    pub output_dir: Option<PathBuf>,
}

/// Outcome of one translated document
#[derive(Debug, Clone)]
pub struct DocumentResult {
    /// Input file
    pub input: PathBuf,
    /// File written, if any
    pub output: Option<PathBuf>,
    /// Target locale used
    pub target_language: String,
    /// Segment outcomes
    pub report: DocumentReport,
    /// Metrics for this document
    pub metrics: RunMetricsSnapshot,
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Shared pipeline; each document gets its own metrics
    pipeline: TranslationPipeline,
    // @field: Metrics destinations
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl Controller {
    /// Create a controller backed by the configured database and backend
    pub fn with_config(config: Config) -> Result<Self> {
        let repository = Self::open_repository(&config)?;
        let memory: Arc<dyn TranslationMemory> =
            Arc::new(SqliteMemory::new(repository, config.pipeline.conflict_policy));
        let backend = Self::create_backend(&config);

        let mut controller = Self::with_components(config, memory, backend);

        if let Some(path) = controller.config.metrics_path.clone() {
            let sink = JsonLinesSink::open(&path)?;
            info!("Writing metrics to {} (run {})", path.display(), sink.run_id());
            controller.sinks.push(Box::new(sink));
        }

        Ok(controller)
    }

    /// Create a controller from explicit components
    ///
    /// Metrics go to the log only.
    pub fn with_components(
        config: Config,
        memory: Arc<dyn TranslationMemory>,
        backend: Arc<dyn TranslationBackend>,
    ) -> Self {
        let translator = BatchTranslator::new(
            backend,
            config.language_map(),
            config.source_language.clone(),
            config.pipeline.batch_size,
        )
        .with_call_timeout(Duration::from_secs(config.backend.timeout_secs));

        Self {
            pipeline: TranslationPipeline::new(memory, translator),
            sinks: vec![Box::new(LogSink)],
            config,
        }
    }

    /// Open the translation memory database named by the configuration
    pub fn open_repository(config: &Config) -> Result<Repository> {
        let path = config.resolved_database_path()?;
        debug!("Opening translation memory at {}", path.display());
        let db = DatabaseConnection::new(&path)
            .with_context(|| format!("Failed to open translation memory: {}", path.display()))?;
        Ok(Repository::new(db))
    }

    /// Build the configured MT backend client
    pub fn create_backend(config: &Config) -> Arc<dyn TranslationBackend> {
        let backend = &config.backend;
        match backend.backend_type {
            BackendType::HuggingFace => Arc::new(HuggingFace::new(
                backend.get_api_token(),
                backend.get_endpoint(),
                backend.get_model(),
                backend.timeout_secs,
            )),
            BackendType::SelfHosted => Arc::new(SelfHosted::new(backend.get_endpoint(), backend.timeout_secs)),
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add a metrics destination
    pub fn add_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    /// Check that the backend answers; failures are reported, not fatal
    pub async fn check_backend(&self) -> bool {
        match self.pipeline.translator().check_connection().await {
            Ok(()) => {
                debug!("{} backend reachable", self.pipeline.translator().backend_name());
                true
            }
            Err(e) => {
                warn!("{} backend check failed: {}", self.pipeline.translator().backend_name(), e);
                false
            }
        }
    }

    /// Pick the target locale of a document
    ///
    /// Explicit override, then the `Name.resx.fr-FR.xlf` file-name convention,
    /// then the document's `target-language` attribute, then the configured default.
    pub fn resolve_target_language(
        &self,
        path: &Path,
        document: &XliffDocument,
        override_language: Option<&str>,
    ) -> String {
        let from_file_name = path
            .file_name()
            .and_then(|name| language_utils::target_language_from_file_name(&name.to_string_lossy()));

        let chosen = override_language
            .map(str::to_string)
            .or(from_file_name)
            .or_else(|| document.target_language().map(str::to_string))
            .unwrap_or_else(|| self.config.target_language.clone());

        normalize_locale(&chosen)
    }

    /// Translate one document and write the result to `output`
    pub async fn translate_document(
        &self,
        input: &Path,
        output: &Path,
        override_language: Option<&str>,
    ) -> Result<DocumentResult> {
        let content = FileManager::read_to_string(input)?;
        let mut document = XliffDocument::parse(content)
            .with_context(|| format!("Failed to parse document: {}", input.display()))?;

        let target_language = self.resolve_target_language(input, &document, override_language);
        info!(
            "Translating {} -> {} ({} units)",
            input.display(),
            language_utils::describe_locale(&target_language),
            document.unit_count()
        );

        let mut segments = document.segments();
        let mut metrics = RunMetrics::new();
        let report = self.pipeline.run(&mut segments, &target_language, &mut metrics).await;

        let written = document
            .apply(&segments)
            .with_context(|| format!("Failed to update document: {}", input.display()))?;

        let output = if written > 0 || output != input {
            FileManager::write_to_file(output, document.as_str())?;
            Some(output.to_path_buf())
        } else {
            None
        };

        let snapshot = metrics.snapshot();
        emit_all(&self.sinks, &input.display().to_string(), &snapshot);

        Ok(DocumentResult {
            input: input.to_path_buf(),
            output,
            target_language,
            report,
            metrics: snapshot,
        })
    }

    /// Translate every document under `input_path`
    ///
    /// A document that fails to load or save is logged and counted; the run
    /// continues with the next one.
    pub async fn run(&self, input_path: &Path, options: &RunOptions) -> Result<RunTotals> {
        let start_time = std::time::Instant::now();

        if !input_path.exists() {
            return Err(anyhow!("Input path does not exist: {:?}", input_path));
        }

        let documents = FileManager::find_documents(input_path)?;
        if documents.is_empty() {
            return Err(anyhow!("No XLIFF documents found in: {:?}", input_path));
        }

        let input_root = if input_path.is_dir() {
            input_path.to_path_buf()
        } else {
            input_path.parent().map(Path::to_path_buf).unwrap_or_default()
        };

        let progress = ProgressBar::new(documents.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("█▓▒░"));
        progress.set_message("Translating");

        let concurrency = self.config.pipeline.concurrent_documents.max(1);
        let override_language = options.target_language.as_deref();

        let results: Vec<(PathBuf, Result<DocumentResult>)> = stream::iter(documents)
            .map(|path| {
                let output = FileManager::output_path(&path, &input_root, options.output_dir.as_deref());
                let progress = progress.clone();
                async move {
                    let result = self.translate_document(&path, &output, override_language).await;
                    progress.inc(1);
                    (path, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        progress.finish_with_message("Done");

        let mut totals = RunTotals::default();
        let mut failures = 0;
        for (path, result) in results {
            match result {
                Ok(document) => {
                    if !document.report.is_complete() {
                        warn!(
                            "{}: {} segment(s) left untranslated",
                            path.display(),
                            document.report.skipped
                        );
                    }
                    totals.add(&document.metrics);
                }
                Err(e) => {
                    error!("Error processing {}: {:#}", path.display(), e);
                    failures += 1;
                }
            }
        }

        info!(
            "Run completed in {}: {}{}",
            Self::format_duration(start_time.elapsed()),
            totals,
            if failures > 0 { format!(", {} document(s) failed", failures) } else { String::new() }
        );

        Ok(totals)
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
