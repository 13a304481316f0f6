//! Configuration from `adx-translate.toml`.
//!
//! ```toml
//! [catalog]
//! functions = "functions.csv"
//! tables = "tables.csv"
//!
//! [corpus]
//! path = "ground_truths.json"
//!
//! [retrieval]
//! top_k = 3
//!
//! [llm]
//! model = "gpt-4o"
//! max_attempts = 5
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{TranslateError, TranslateResult};
use crate::similarity::DEFAULT_GROUP_THRESHOLD;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "adx-translate.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
}

/// Paths to the function, table and keyword lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// CSV with `Name`, `Body` and `Folder` columns.
    pub functions: Option<PathBuf>,
    /// CSV with a `TableName` column.
    pub tables: Option<PathBuf>,
    /// Newline-delimited keywords; the built-in Kusto list when unset.
    pub keywords: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// JSON array of `{"kql": ..., "sql": ...}` pairs.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub group_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            group_threshold: DEFAULT_GROUP_THRESHOLD,
        }
    }
}

/// Chat-completions endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub max_attempts: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPEN_AI_API_KEY".to_string(),
            max_attempts: 5,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> TranslateResult<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            TranslateError::Config(format!("environment variable {} is not set", self.api_key_env))
        })
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn parse(text: &str) -> TranslateResult<Self> {
        toml::from_str(text).map_err(|e| TranslateError::Config(e.to_string()))
    }

    /// Load from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> TranslateResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            TranslateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load from `explicit` if given, else the first of `./adx-translate.toml`
    /// and `<config dir>/adx-translate/config.toml` that exists, else defaults.
    pub fn discover(explicit: Option<&Path>) -> TranslateResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => {
                tracing::debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("adx-translate").join("config.toml"));
        }
        paths
    }
}
