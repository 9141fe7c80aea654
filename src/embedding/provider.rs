// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider interface and implementations.
//!
//! FAQ questions and user queries must be embedded by the same provider.
//! The built-in provider runs a multilingual sentence-transformers model
//! through fastembed; the command provider shells out; the hashing provider
//! needs no model at all.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::borrow::Cow;
use std::env;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::config::{EmbeddingConfig, EmbeddingProviderType};

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

/// Default embedding dimension for the MiniLM family and the hashing provider.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

const DEFAULT_FASTEMBED_MODEL: &str = "paraphrase-multilingual-minilm-l12-v2";
const DEFAULT_FASTEMBED_BATCH_SIZE: usize = 256;
const MAX_FASTEMBED_BATCH_SIZE: usize = 1024;
const DEFAULT_FASTEMBED_MAX_CHARS: usize = 2000;
const DEFAULT_COMMAND_BATCH_SIZE: usize = 64;
const DEFAULT_HASHING_BATCH_SIZE: usize = 512;

/// Configuration for the built-in embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingProviderConfig {
    pub model: String,
    pub batch_size: usize,
    pub max_chars: usize,
    pub normalize: bool,
}

impl EmbeddingProviderConfig {
    /// Builds the config from the `[embeddings]` table, then applies env overrides.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let defaults = Self::default();
        Self {
            model: config
                .model
                .clone()
                .unwrap_or(defaults.model),
            batch_size: config.batch_size.unwrap_or(defaults.batch_size),
            max_chars: config.max_chars.unwrap_or(defaults.max_chars),
            normalize: defaults.normalize,
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(raw) = env::var("FASTEMBED_MODEL") {
            if !raw.trim().is_empty() {
                self.model = raw.trim().to_string();
            }
        }

        self.batch_size = parse_usize_env("FASTEMBED_BATCH_SIZE", self.batch_size)?;
        if self.batch_size == 0 {
            self.batch_size = DEFAULT_FASTEMBED_BATCH_SIZE;
        }
        if self.batch_size > MAX_FASTEMBED_BATCH_SIZE {
            tracing::warn!(
                "batch size {} exceeds max {}; clamping",
                self.batch_size,
                MAX_FASTEMBED_BATCH_SIZE
            );
            self.batch_size = MAX_FASTEMBED_BATCH_SIZE;
        }

        self.max_chars = parse_usize_env("FASTEMBED_MAX_CHARS", self.max_chars)?;
        if self.max_chars == 0 {
            self.max_chars = DEFAULT_FASTEMBED_MAX_CHARS;
        }

        self.normalize = parse_bool_env("FASTEMBED_NORMALIZE", self.normalize)?;

        Ok(self)
    }
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_FASTEMBED_MODEL.to_string(),
            batch_size: DEFAULT_FASTEMBED_BATCH_SIZE,
            max_chars: DEFAULT_FASTEMBED_MAX_CHARS,
            normalize: true,
        }
    }
}

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Returns the batch size used by the provider.
    fn batch_size(&self) -> usize;

    /// Generates embeddings for the given texts, one vector per text.
    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generates an embedding for a single text.
    fn embed_one(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut result = self.embed_texts(&[text.to_string()])?;
        result
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned"))
    }
}

/// Builds the provider selected by the `[embeddings]` configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let provider: Box<dyn EmbeddingProvider> = match config.provider() {
        EmbeddingProviderType::Builtin => builtin_provider(config)?,
        EmbeddingProviderType::Command => Box::new(CommandProvider::new(
            config.command().to_string(),
            config.model().map(str::to_string),
        )),
        EmbeddingProviderType::Hashing => Box::new(HashingProvider::new(config.dimension())),
    };
    tracing::debug!(model = provider.model_id(), "embedding provider ready");
    Ok(provider)
}

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
fn builtin_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    Ok(Box::new(FastEmbedder::new(EmbeddingProviderConfig::from_config(config)?)?))
}

#[cfg(all(target_os = "macos", target_arch = "x86_64"))]
fn builtin_provider(_config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    bail!("The builtin embedding provider is unavailable on this platform; use provider = \"command\" or \"hashing\"")
}

/// FastEmbed provider, defaulting to paraphrase-multilingual-MiniLM-L12-v2.
#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub struct FastEmbedder {
    embedder: TextEmbedding,
    config: EmbeddingProviderConfig,
    model_id: String,
}

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
impl FastEmbedder {
    pub fn new(config: EmbeddingProviderConfig) -> Result<Self> {
        let model = parse_model_name(&config.model)?;
        let model_id = model.to_string();
        let init = InitOptions::new(model);
        let embedder =
            TextEmbedding::try_new(init).context("Failed to initialize fastembed model")?;

        Ok(Self {
            embedder,
            config,
            model_id,
        })
    }
}

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
impl EmbeddingProvider for FastEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let prepared = truncate_texts(texts, self.config.max_chars);
        let mut embeddings = self
            .embedder
            .embed(&prepared, Some(self.config.batch_size))?;

        if self.config.normalize {
            for embedding in embeddings.iter_mut() {
                l2_normalize(embedding);
            }
        }

        Ok(embeddings)
    }
}

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
fn parse_model_name(raw: &str) -> Result<EmbeddingModel> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(EmbeddingModel::ParaphraseMLMiniLML12V2);
    }

    match value.to_lowercase().as_str() {
        "paraphrase-multilingual-minilm-l12-v2"
        | "sentence-transformers/paraphrase-multilingual-minilm-l12-v2"
        | "multilingual" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "minilm"
        | "all-minilm-l6-v2"
        | "sentence-transformers/all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        other => bail!(
            "Unsupported embedding model '{}'. Supported values: {}, minilm",
            other,
            DEFAULT_FASTEMBED_MODEL
        ),
    }
}

/// Command provider that shells out to an external process.
///
/// The command receives `{"model": ..., "texts": [...]}` on stdin and prints
/// the embeddings as JSON on stdout. `model` is `null` when none is configured.
///
/// The model id is `command:<command>`, with `#<model>` appended when a model
/// is set, so cached vectors are never shared between different commands.
pub struct CommandProvider {
    command: String,
    model: Option<String>,
    model_id: String,
    batch_size: usize,
}

impl CommandProvider {
    pub fn new(command: String, model: Option<String>) -> Self {
        let model_id = match &model {
            Some(model) => format!("command:{}#{}", command, model),
            None => format!("command:{}", command),
        };
        Self {
            command,
            model,
            model_id,
            batch_size: DEFAULT_COMMAND_BATCH_SIZE,
        }
    }

    fn run_command(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let payload = serde_json::json!({
            "model": self.model,
            "texts": texts,
        });

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn embedding command: {}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.to_string().as_bytes())
                .context("Failed to write embeddings payload to stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to read embeddings command output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Embedding command failed (status {}): {}",
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_command_output(stdout.trim())
    }
}

impl EmbeddingProvider for CommandProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run_command(texts)
    }
}

fn parse_command_output(stdout: &str) -> Result<Vec<Vec<f32>>> {
    let parsed: Value = serde_json::from_str(stdout)
        .context("Failed to parse embeddings command output as JSON")?;

    let embeddings_value = match parsed {
        Value::Array(arr) => Value::Array(arr),
        Value::Object(ref obj) => {
            if let Some(value) = obj.get("embeddings") {
                value.clone()
            } else if let Some(value) = obj.get("vectors") {
                value.clone()
            } else if let Some(value) = obj.get("data") {
                value.clone()
            } else {
                bail!("Embeddings command output missing 'embeddings' field");
            }
        }
        _ => bail!("Embeddings command output must be JSON array or object"),
    };

    embeddings_value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Embeddings output must be a JSON array"))?
        .iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| anyhow::anyhow!("Embedding row must be an array"))?
                .iter()
                .map(|value| {
                    value
                        .as_f64()
                        .ok_or_else(|| anyhow::anyhow!("Embedding value must be a number"))
                        .map(|v| v as f32)
                })
                .collect::<Result<Vec<f32>>>()
        })
        .collect()
}

/// Model-free provider that feature-hashes word tokens.
///
/// Each lower-cased alphanumeric token lands in one of `dimension` buckets
/// with a hash-derived sign. Texts sharing words get similar vectors, which
/// is enough for tests and offline demos. Text without tokens embeds to the
/// zero vector.
pub struct HashingProvider {
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            model: format!("hashing-{}", dimension),
            dimension,
            batch_size: DEFAULT_HASHING_BATCH_SIZE,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl EmbeddingProvider for HashingProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn truncate_texts<'a>(texts: &'a [String], max_chars: usize) -> Vec<Cow<'a, str>> {
    texts
        .iter()
        .map(|text| truncate_to_chars(text.as_str(), max_chars))
        .collect()
}

fn truncate_to_chars<'a>(input: &'a str, max_chars: usize) -> Cow<'a, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(input[..idx].to_string()),
        None => Cow::Borrowed(input),
    }
}

/// Scales `vector` to unit length in place. Zero vectors are left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

fn parse_usize_env(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim();
            if value.is_empty() {
                Ok(default)
            } else {
                value
                    .parse::<usize>()
                    .with_context(|| format!("Invalid {} value: {}", name, value))
            }
        }
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", name)),
    }
}

fn parse_bool_env(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim().to_lowercase();
            if value.is_empty() {
                return Ok(default);
            }
            match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => bail!("Invalid {} value: {}", name, other),
            }
        }
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::cosine_similarity;

    #[test]
    fn test_hashing_provider_is_deterministic() {
        let mut provider = HashingProvider::new(64);
        assert_eq!(provider.model_id(), "hashing-64");

        let a = provider.embed_one("How do I reset my password?").unwrap();
        let b = provider.embed_one("how do i RESET my password").unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hashing_provider_unit_norm() {
        let mut provider = HashingProvider::new(DEFAULT_EMBEDDING_DIM);
        let v = provider.embed_one("shipping to Canada").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_provider_shared_words_score_higher() {
        let mut provider = HashingProvider::new(DEFAULT_EMBEDDING_DIM);
        let texts = vec![
            "How do I reset my password?".to_string(),
            "Which payment methods do you accept?".to_string(),
        ];
        let docs = provider.embed_texts(&texts).unwrap();
        let query = provider.embed_one("reset password").unwrap();
        let close = cosine_similarity(&query, &docs[0]).unwrap();
        let far = cosine_similarity(&query, &docs[1]).unwrap();
        assert!(close > far);
    }

    #[test]
    fn test_hashing_provider_blank_text_is_zero() {
        let mut provider = HashingProvider::new(16);
        let v = provider.embed_one("?!  ").unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_empty_embed() {
        let mut provider = HashingProvider::new(384);
        let result = provider.embed_texts(&[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_command_output_shapes() {
        let bare = parse_command_output("[[1, 0], [0.5, 0.5]]").unwrap();
        assert_eq!(bare, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);

        let wrapped = parse_command_output(r#"{"embeddings": [[0.25]]}"#).unwrap();
        assert_eq!(wrapped, vec![vec![0.25]]);

        assert!(parse_command_output(r#"{"other": []}"#).is_err());
        assert!(parse_command_output(r#"[["x"]]"#).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_provider_runs_shell_command() {
        let mut provider = CommandProvider::new(
            "cat >/dev/null; echo '[[3, 4]]'".to_string(),
            Some("fixed".to_string()),
        );
        let result = provider.embed_texts(&["anything".to_string()]).unwrap();
        assert_eq!(result, vec![vec![3.0, 4.0]]);
        assert_eq!(provider.model_id(), "command:cat >/dev/null; echo '[[3, 4]]'#fixed");
    }

    #[test]
    fn test_command_model_id_names_the_command() {
        let a = CommandProvider::new("embed-a".to_string(), None);
        let b = CommandProvider::new("embed-b".to_string(), None);
        assert_eq!(a.model_id(), "command:embed-a");
        assert_eq!(b.model_id(), "command:embed-b");

        let tagged = CommandProvider::new("embed-a".to_string(), Some("v2".to_string()));
        assert_eq!(tagged.model_id(), "command:embed-a#v2");
    }

    #[test]
    fn test_provider_config_comes_from_embeddings_table() {
        if ["FASTEMBED_MODEL", "FASTEMBED_BATCH_SIZE", "FASTEMBED_MAX_CHARS"]
            .iter()
            .any(|key| env::var(key).is_ok())
        {
            return;
        }
        let config = EmbeddingConfig {
            model: Some("minilm".to_string()),
            batch_size: Some(5000),
            max_chars: Some(120),
            ..Default::default()
        };
        let resolved = EmbeddingProviderConfig::from_config(&config).unwrap();
        assert_eq!(resolved.model, "minilm");
        assert_eq!(resolved.batch_size, MAX_FASTEMBED_BATCH_SIZE);
        assert_eq!(resolved.max_chars, 120);

        let defaults = EmbeddingProviderConfig::from_config(&EmbeddingConfig::default()).unwrap();
        assert_eq!(defaults.model, DEFAULT_FASTEMBED_MODEL);
    }

    #[test]
    fn test_create_command_provider_without_model() {
        let config = EmbeddingConfig {
            provider: Some(EmbeddingProviderType::Command),
            command: Some("my-embedder --fast".to_string()),
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_id(), "command:my-embedder --fast");
    }

    #[test]
    fn test_truncate_to_chars() {
        let input = "hello";
        assert_eq!(
            truncate_to_chars(input, 2),
            Cow::<str>::Owned("he".to_string())
        );
        assert_eq!(truncate_to_chars(input, 5), Cow::Borrowed(input));
        assert_eq!(truncate_to_chars("héllo", 2), Cow::<str>::Owned("hé".to_string()));
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.6, 0.8]);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
