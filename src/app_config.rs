use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::database::{ConflictPolicy, DatabaseConnection};
use crate::file_utils::FileManager;
use crate::language_utils::LanguageMap;
use crate::providers::{huggingface, self_hosted};

// @module: Application configuration (loading, validating and saving conf.json)

/// Environment variable consulted when no API token is configured
pub const API_TOKEN_ENV: &str = "HF_TOKEN";

/// Largest batch a backend call may carry
pub const MAX_BATCH_SIZE: usize = 256;

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source locale of every document (e.g. "en-US")
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target locale used when a document does not name one
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// MT backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Extra or replacement locale -> backend tag entries
    #[serde(default)]
    pub language_map: HashMap<String, String>,

    /// Translation memory database file (platform data dir when unset)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// JSON-lines file receiving one metrics record per document
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// MT backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Hugging Face hosted inference
    #[default]
    HuggingFace,
    /// Self-hosted translation server
    SelfHosted,
}

impl BackendType {
    /// Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::HuggingFace => "Hugging Face",
            Self::SelfHosted => "Self-hosted",
        }
    }

    /// Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::HuggingFace => "huggingface".to_string(),
            Self::SelfHosted => "selfhosted".to_string(),
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for BackendType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "selfhosted" | "vm" => Ok(Self::SelfHosted),
            _ => Err(anyhow!("Invalid backend type: {}", s)),
        }
    }
}

/// MT backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    /// Backend type identifier
    #[serde(rename = "type", default)]
    pub backend_type: BackendType,

    /// Service URL (backend default when empty)
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Model identifier (hosted inference only)
    #[serde(default = "String::new")]
    pub model: String,

    /// API token (hosted inference only)
    #[serde(default = "String::new")]
    pub api_token: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Backend config with defaults for the given type
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            backend_type,
            endpoint: String::new(),
            model: String::new(),
            api_token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Endpoint, falling back to the backend default
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }

        match self.backend_type {
            BackendType::HuggingFace => huggingface::DEFAULT_ENDPOINT.to_string(),
            BackendType::SelfHosted => self_hosted::DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Model, falling back to the backend default
    pub fn get_model(&self) -> String {
        if self.model.is_empty() {
            huggingface::DEFAULT_MODEL.to_string()
        } else {
            self.model.clone()
        }
    }

    /// API token from config, else from the environment
    pub fn get_api_token(&self) -> String {
        if !self.api_token.is_empty() {
            return self.api_token.clone();
        }
        std::env::var(API_TOKEN_ENV).unwrap_or_default()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(BackendType::default())
    }
}

/// Pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Maximum segments per backend call
    ///
    /// Smaller batches lose fewer segments when a call fails, at the cost of
    /// more calls and more per-call overhead.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// What an insert does when the key already exists
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Documents processed at the same time
    #[serde(default = "default_concurrent_documents")]
    pub concurrent_documents: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            conflict_policy: ConflictPolicy::default(),
            concurrent_documents: default_concurrent_documents(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en-US".to_string()
}

fn default_target_language() -> String {
    "fr-FR".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_batch_size() -> usize {
    20
}

fn default_concurrent_documents() -> usize {
    1
}

impl Config {
    /// Load configuration from `path`, writing a default file when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Load configuration from an existing file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        FileManager::write_to_file(path, &config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.batch_size == 0 || self.pipeline.batch_size > MAX_BATCH_SIZE {
            return Err(anyhow!(
                "pipeline.batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                self.pipeline.batch_size
            ));
        }

        if self.pipeline.concurrent_documents == 0 {
            return Err(anyhow!("pipeline.concurrent_documents must be at least 1"));
        }

        if self.backend.timeout_secs == 0 {
            return Err(anyhow!("backend.timeout_secs must be at least 1"));
        }

        if !self.backend.endpoint.is_empty() {
            url::Url::parse(&self.backend.endpoint)
                .with_context(|| format!("Invalid backend endpoint: {}", self.backend.endpoint))?;
        }

        if self.backend.backend_type == BackendType::HuggingFace && self.backend.get_api_token().is_empty() {
            return Err(anyhow!(
                "An API token is required for the huggingface backend (set backend.api_token or {})",
                API_TOKEN_ENV
            ));
        }

        let languages = self.language_map();
        if !languages.supports(&self.source_language) {
            return Err(anyhow!(
                "Source language '{}' has no backend language tag",
                self.source_language
            ));
        }

        if !languages.supports(&self.target_language) {
            warn!(
                "Default target language '{}' has no backend language tag; documents relying on it will be left untranslated",
                self.target_language
            );
        }

        Ok(())
    }

    /// The locale -> backend tag table: built-in entries plus overrides
    pub fn language_map(&self) -> LanguageMap {
        LanguageMap::with_overrides(&self.language_map)
    }

    /// Translation memory location, resolving the default
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => DatabaseConnection::default_database_path(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            backend: BackendConfig::default(),
            pipeline: PipelineConfig::default(),
            language_map: HashMap::new(),
            database_path: None,
            metrics_path: None,
            log_level: LogLevel::default(),
        }
    }
}
