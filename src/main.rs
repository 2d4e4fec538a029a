// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tmflow::app_config::{self, BackendType, Config};
use tmflow::app_controller::{Controller, RunOptions};
use tmflow::database::ConflictPolicy;
use tmflow::translation::{InMemoryMemory, JsonLinesSink};

/// CLI Wrapper for BackendType to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBackend {
    #[value(name = "huggingface")]
    HuggingFace,
    #[value(name = "selfhosted")]
    SelfHosted,
}

impl From<CliBackend> for BackendType {
    fn from(cli_backend: CliBackend) -> Self {
        match cli_backend {
            CliBackend::HuggingFace => BackendType::HuggingFace,
            CliBackend::SelfHosted => BackendType::SelfHosted,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Translation memory database file
    #[arg(long)]
    database: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// XLIFF file or directory to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Target locale for every document (e.g. 'fr-FR'); otherwise taken from each file
    #[arg(short, long)]
    target_language: Option<String>,

    /// Source locale (e.g. 'en-US')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Write translated documents here instead of in place
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// MT backend to use
    #[arg(short, long, value_enum)]
    backend: Option<CliBackend>,

    /// Backend endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Model identifier for hosted inference
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum segments per backend call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Documents translated at the same time
    #[arg(long)]
    concurrency: Option<usize>,

    /// Keep stored translations instead of overwriting them
    #[arg(long)]
    keep_existing: bool,

    /// Append per-document metrics to this JSON-lines file
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Keep the translation memory in memory for this run only
    #[arg(long)]
    no_cache_db: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate XLIFF documents (default command)
    Translate(TranslateArgs),

    /// Show translation memory statistics
    CacheStats {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Remove translation memory entries
    CacheClear {
        /// Only remove entries of this target locale
        #[arg(short, long)]
        target_language: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate shell completions for tmflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// tmflow - cache-first machine translation of XLIFF documents
///
/// Serves known segments from a translation memory and sends the rest to a
/// machine-translation backend in bounded batches.
#[derive(Parser, Debug)]
#[command(name = "tmflow")]
#[command(version)]
#[command(about = "Cache-first batch translation of XLIFF documents")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "tmflow translates XLIFF documents through a translation memory and a machine-translation backend.

EXAMPLES:
    tmflow Strings.resx.fr-FR.xlf               # Target language taken from the file name
    tmflow -t de-DE ./locales                   # Translate a whole directory into German
    tmflow -o ./out --batch-size 50 ./locales   # Write results elsewhere, larger batches
    tmflow -b selfhosted --endpoint http://10.0.0.4:8000 ./locales
    tmflow --no-cache-db -t it-IT ./locales     # One-off run without the database
    tmflow cache-stats                          # Show translation memory statistics
    tmflow cache-clear -t fr-FR                 # Forget French translations
    tmflow completions bash > tmflow.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The hosted inference token may also be given
    through the HF_TOKEN environment variable.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and label for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, label) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, label, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "tmflow", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::CacheStats { common }) => run_cache_stats(common).await,
        Some(Commands::CacheClear { target_language, common }) => run_cache_clear(common, target_language).await,
        None => run_translate(cli.translate).await,
    }
}

// @loads: Config with the shared CLI overrides applied, and sets the log level
fn load_config(common: &CommonArgs) -> Result<Config> {
    if let Some(level) = &common.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&common.config_path)?;

    if let Some(level) = &common.log_level {
        config.log_level = level.clone().into();
    }
    if let Some(database) = &common.database {
        config.database_path = Some(database.clone());
    }

    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let input_path = options
        .input_path
        .clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    let mut config = load_config(&options.common)?;

    // Override config with CLI options if provided
    if let Some(backend) = &options.backend {
        config.backend.backend_type = backend.clone().into();
    }
    if let Some(endpoint) = &options.endpoint {
        config.backend.endpoint = endpoint.clone();
    }
    if let Some(model) = &options.model {
        config.backend.model = model.clone();
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(batch_size) = options.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(concurrency) = options.concurrency {
        config.pipeline.concurrent_documents = concurrency;
    }
    if options.keep_existing {
        config.pipeline.conflict_policy = ConflictPolicy::KeepExisting;
    }
    if let Some(metrics_file) = &options.metrics_file {
        config.metrics_path = Some(metrics_file.clone());
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    info!(
        "Using {} backend, batch size {}, {} policy",
        config.backend.backend_type.display_name(),
        config.pipeline.batch_size,
        config.pipeline.conflict_policy
    );

    let controller = if options.no_cache_db {
        info!("Translation memory is not persisted for this run");
        let memory = Arc::new(InMemoryMemory::with_policy(config.pipeline.conflict_policy));
        let metrics_path = config.metrics_path.clone();
        let backend = Controller::create_backend(&config);
        let mut controller = Controller::with_components(config, memory, backend);
        if let Some(path) = metrics_path {
            controller.add_sink(Box::new(JsonLinesSink::open(&path)?));
        }
        controller
    } else {
        Controller::with_config(config)?
    };
    controller.check_backend().await;

    let run_options = RunOptions {
        target_language: options.target_language.clone(),
        output_dir: options.output_dir.clone(),
    };
    controller.run(&input_path, &run_options).await?;

    Ok(())
}

async fn run_cache_stats(common: CommonArgs) -> Result<()> {
    let config = load_config(&common)?;
    let repository = Controller::open_repository(&config)?;

    let stats = repository.stats().await?;
    let db_stats = repository.connection().stats()?;

    println!("{}", db_stats);
    println!("{}", stats);
    Ok(())
}

async fn run_cache_clear(common: CommonArgs, target_language: Option<String>) -> Result<()> {
    let config = load_config(&common)?;
    let repository = Controller::open_repository(&config)?;

    let target_language = target_language.map(|l| tmflow::language_utils::normalize_locale(&l));
    let deleted = repository.clear(target_language.as_deref()).await?;
    repository.connection().vacuum()?;

    match target_language {
        Some(language) => println!("Removed {} entries for {}", deleted, language),
        None => println!("Removed {} entries", deleted),
    }
    Ok(())
}
