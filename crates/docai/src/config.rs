//! Configuration for the ingestion service
//!
//! Settings come from an optional TOML file, then `DOCAI_*` environment
//! overrides (plus `OPENAI_API_KEY`), and are validated once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::SupportedFormats;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DocaiConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Archive and database locations
    pub storage: StorageConfig,
    /// Ingestion behaviour
    pub ingestion: IngestionConfig,
    /// Language model used for enhancement
    pub llm: LlmConfig,
    /// OCR and PDF rasterization
    pub ocr: OcrConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 10MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory that receives archived copies of ingested files
    pub archive_dir: PathBuf,
    /// SQLite database file
    pub database_path: PathBuf,
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        .join("docai")
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = data_dir();
        Self {
            archive_dir: base.join("storage"),
            database_path: base.join("documents.db"),
        }
    }
}

/// What to do with a file whose enhancement call failed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementFailurePolicy {
    /// Log a warning and persist the raw extracted text
    #[default]
    FallbackToRaw,
    /// Report the file as failed at the enhancement stage
    SkipFile,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Accepted file extensions
    pub supported_formats: Vec<String>,
    /// Enhancement failure handling
    pub on_enhancement_failure: EnhancementFailurePolicy,
    /// Concurrent single-file pipelines during directory ingestion
    pub parallel_files: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            supported_formats: ["pdf", "png", "jpg", "jpeg", "docx", "xlsx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            on_enhancement_failure: EnhancementFailurePolicy::default(),
            parallel_files: 1,
        }
    }
}

/// LLM backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend to talk to
    pub provider: LlmBackend,
    /// Base URL of the backend (no trailing path)
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API key (OpenAI backend)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Completion length bound
    pub max_tokens: u32,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt, transient failures only
    pub max_retries: u32,
    /// Backoff unit; attempt n waits 2^n times this
    pub retry_base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmBackend::OpenAi,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 1500,
            timeout_secs: 60,
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

/// OCR and rasterization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable
    pub tesseract_cmd: String,
    /// Tesseract language pack
    pub language: String,
    /// Tesseract page segmentation mode
    pub page_seg_mode: u8,
    /// Rasterization resolution for image-only PDFs
    pub dpi: u32,
    /// Try the in-process pdfium renderer before pdftoppm
    pub prefer_pdfium: bool,
    /// Directory containing the pdfium shared library (system lookup when unset)
    pub pdfium_library_path: Option<PathBuf>,
    /// pdftoppm executable
    pub pdftoppm_cmd: String,
    /// Upper bound for the secondary whole-document PDF text pass
    pub pdf_text_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            page_seg_mode: 3,
            dpi: 300,
            prefer_pdfium: true,
            pdfium_library_path: None,
            pdftoppm_cmd: "pdftoppm".to_string(),
            pdf_text_timeout_secs: 60,
        }
    }
}

impl DocaiConfig {
    /// Load configuration from an optional TOML file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing sections take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply `DOCAI_*` overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| -> Option<String> {
            lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        if let Some(host) = parsed("DOCAI_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed("DOCAI_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(size) = parsed("DOCAI_MAX_UPLOAD_SIZE").and_then(|v| v.parse().ok()) {
            self.server.max_upload_size = size;
        }
        if let Some(dir) = parsed("DOCAI_STORAGE_PATH") {
            self.storage.archive_dir = PathBuf::from(dir);
        }
        if let Some(db) = parsed("DOCAI_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(db);
        }
        if let Some(formats) = parsed("DOCAI_SUPPORTED_FORMATS") {
            self.ingestion.supported_formats = formats
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
        if let Some(n) = parsed("DOCAI_PARALLEL_FILES").and_then(|v| v.parse().ok()) {
            self.ingestion.parallel_files = n;
        }
        match parsed("DOCAI_LLM_PROVIDER").as_deref() {
            Some("ollama") => self.llm.provider = LlmBackend::Ollama,
            Some("openai") => self.llm.provider = LlmBackend::OpenAi,
            Some(other) => tracing::warn!("Ignoring unknown DOCAI_LLM_PROVIDER: {}", other),
            None => {}
        }
        if let Some(url) = parsed("DOCAI_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = parsed("DOCAI_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = parsed("DOCAI_LLM_API_KEY").or_else(|| parsed("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(cmd) = parsed("DOCAI_TESSERACT_CMD") {
            self.ocr.tesseract_cmd = cmd;
        }
        if let Some(lang) = parsed("DOCAI_OCR_LANGUAGE") {
            self.ocr.language = lang;
        }
        if let Some(dir) = parsed("DOCAI_PDFIUM_LIBRARY_PATH") {
            self.ocr.pdfium_library_path = Some(PathBuf::from(dir));
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.supported_formats()?;

        if self.ingestion.parallel_files == 0 {
            return Err(Error::Config("ingestion.parallel_files must be at least 1".into()));
        }
        if self.server.max_upload_size == 0 {
            return Err(Error::Config("server.max_upload_size must be positive".into()));
        }
        if self.ocr.dpi == 0 || self.ocr.dpi > 1200 {
            return Err(Error::Config(format!(
                "ocr.dpi must be between 1 and 1200, got {}",
                self.ocr.dpi
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 || self.llm.timeout_secs == 0 {
            return Err(Error::Config(
                "llm.max_tokens and llm.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The configured format set
    pub fn supported_formats(&self) -> Result<SupportedFormats> {
        SupportedFormats::from_extensions(&self.ingestion.supported_formats)
    }
}
