use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Application configuration module
/// This module holds the configuration structs for the translation pipeline:
/// provider connection settings, chunking and concurrency knobs, and the
/// reinsertion policy for formats that support combining original and
/// translated text.
/// How translated text is combined with the original at reinsertion time
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// Translated text replaces the original
    #[default]
    Replace,
    /// Original text, separator, then translated text
    Append,
    /// Translated text, separator, then original text
    Prepend,
}

impl InsertMode {
    /// Combine original and translated text according to the mode
    pub fn combine(&self, original: &str, translated: &str, separator: &str) -> String {
        match self {
            Self::Replace => translated.to_string(),
            Self::Append => format!("{}{}{}", original, separator, translated),
            Self::Prepend => format!("{}{}{}", translated, separator, original),
        }
    }
}

impl std::str::FromStr for InsertMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            "prepend" => Ok(Self::Prepend),
            _ => Err(anyhow!("Invalid insert mode: {}", s)),
        }
    }
}

/// Connection settings for an OpenAI-compatible chat endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Base URL of the endpoint, e.g. "https://api.example.com/v1"
    #[serde(default = "String::new")]
    pub base_url: String,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model identifier
    #[serde(default = "String::new")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Whether to pick up the system proxy from the environment
    #[serde(default)]
    pub proxy_enable: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            temperature: default_temperature(),
            proxy_enable: false,
        }
    }
}

/// Glossary settings for one translation run
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GlossaryConfig {
    /// Ask the model to extract a term table before translating
    #[serde(default)]
    pub generate: bool,

    /// User-supplied term mappings, merged over generated ones
    #[serde(default)]
    pub terms: BTreeMap<String, String>,
}

/// Configuration for the translation stage of a workflow
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Provider connection settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Target language, as a code or a name ("fr", "fra", "French")
    pub target_language: String,

    /// Maximum characters of fragment text per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum number of concurrent LLM calls
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum LLM attempts per chunk, first call included
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds for exponential retry delays
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Optional rate limit in requests per minute across all workers
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// Pass fragments through untouched (diagnostic / dry-run mode)
    #[serde(default)]
    pub skip_translate: bool,

    /// Glossary settings
    #[serde(default)]
    pub glossary: GlossaryConfig,

    /// Reinsertion policy for formats that support it (docx, xlsx, html)
    #[serde(default)]
    pub insert_mode: InsertMode,

    /// Separator between original and translated text in append/prepend modes
    #[serde(default = "default_separator")]
    pub separator: String,

    /// JSON path patterns selecting translatable values; empty means everything
    #[serde(default)]
    pub json_paths: Vec<String>,

    /// Extra instructions appended to the translation system prompt
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

impl TranslationConfig {
    /// Minimal config for translating into one language
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            provider: ProviderConfig::default(),
            target_language: target_language.into(),
            chunk_size: default_chunk_size(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
            skip_translate: false,
            glossary: GlossaryConfig::default(),
            insert_mode: InsertMode::default(),
            separator: default_separator(),
            json_paths: Vec::new(),
            custom_prompt: None,
        }
    }

    /// Validate connection settings.
    ///
    /// Provider fields are only required when translation actually runs;
    /// a dry run needs none of them.
    pub fn validate(&self) -> Result<()> {
        if self.skip_translate {
            return Ok(());
        }
        if self.provider.base_url.is_empty() {
            return Err(anyhow!("base_url is required unless skip_translate is set"));
        }
        if self.provider.model.is_empty() {
            return Err(anyhow!("model is required unless skip_translate is set"));
        }
        if self.chunk_size == 0 {
            return Err(anyhow!("chunk_size must be greater than zero"));
        }
        if self.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be greater than zero"));
        }
        Ok(())
    }
}

// Serde default helpers

fn default_temperature() -> f32 {
    0.7
}

fn default_chunk_size() -> usize {
    3000
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_separator() -> String {
    "\n".to_string()
}
