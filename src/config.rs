// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for faqseek
//!
//! Loads configuration from .faqseekrc.toml in current directory or ~/.config/faqseek/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::embedding::provider::DEFAULT_EMBEDDING_DIM;
use crate::faq::DEFAULT_FAQ_PATH;
use crate::retrieval::DEFAULT_TOP_K;

/// Local config file name, looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = ".faqseekrc.toml";

/// Output format for results (mirrored from cli for library use)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOutputFormat {
    #[default]
    Text,
    Json,
}

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    #[default]
    Builtin,
    Command,
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (builtin, command, hashing)
    pub provider: Option<EmbeddingProviderType>,
    /// Model identifier for the embedding provider
    pub model: Option<String>,
    /// Command to execute for command provider
    pub command: Option<String>,
    /// Vector dimension for the hashing provider
    pub dimension: Option<usize>,
    /// Texts per embedding call
    pub batch_size: Option<usize>,
    /// Characters kept per text before embedding
    pub max_chars: Option<usize>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to Builtin)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier, if one is configured
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    /// Get command (defaults to "embedder")
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or("embedder")
    }

    /// Get hashing dimension (defaults to 384)
    pub fn dimension(&self) -> usize {
        self.dimension.unwrap_or(DEFAULT_EMBEDDING_DIM)
    }
}

/// Embedding cache configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether corpus embeddings are cached on disk
    pub enabled: Option<bool>,
    /// Location of the cache database
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    /// Get enabled (defaults to true)
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Get cache path, if one is configured
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Configuration loaded from .faqseekrc.toml or ~/.config/faqseek/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the FAQ JSON file
    pub faq_path: Option<PathBuf>,
    /// Number of matches to show per query
    pub top_k: Option<usize>,
    /// Matches scoring below this are hidden
    pub min_score: Option<f32>,
    /// Default output format (text or json)
    pub default_format: Option<String>,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .faqseekrc.toml in current directory
    /// 2. ~/.config/faqseek/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(LOCAL_CONFIG_FILE)) {
            tracing::debug!("loaded config from {}", LOCAL_CONFIG_FILE);
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("faqseek").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                tracing::debug!("loaded config from {}", config_path.display());
                return config;
            }
        }

        Self::default()
    }

    /// Load a specific config file, returning None if missing or malformed
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match Self::parse(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get output format from config, parsing the string to ConfigOutputFormat
    pub fn output_format(&self) -> Option<ConfigOutputFormat> {
        self.default_format.as_ref().and_then(|s| match s.to_lowercase().as_str() {
            "json" => Some(ConfigOutputFormat::Json),
            "text" => Some(ConfigOutputFormat::Text),
            _ => None,
        })
    }

    /// Merge CLI FAQ path with config (CLI wins)
    pub fn merge_faq_path(&self, cli_value: Option<PathBuf>) -> PathBuf {
        cli_value
            .or_else(|| self.faq_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FAQ_PATH))
    }

    /// Merge CLI top-k with config (CLI wins)
    pub fn merge_top_k(&self, cli_value: Option<usize>) -> usize {
        cli_value.or(self.top_k).unwrap_or(DEFAULT_TOP_K)
    }

    /// Merge CLI minimum score with config (CLI wins)
    pub fn merge_min_score(&self, cli_value: Option<f32>) -> Option<f32> {
        cli_value.or(self.min_score)
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }

    /// Get the cache configuration
    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }
}
