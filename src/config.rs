use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::models::Settings;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// `filesystem` or `http`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Root directory for the filesystem backend.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Base URL for the http backend (objects live at `{base_url}/{path}`).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Fixed path prefix prepended to every uploaded document's filename.
    #[serde(default = "default_document_prefix")]
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            root: default_storage_root(),
            base_url: None,
            prefix: default_document_prefix(),
        }
    }
}

fn default_storage_backend() -> String {
    "filesystem".to_string()
}
fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/objects")
}
fn default_document_prefix() -> String {
    "documents/".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Characters shared between consecutive chunks. Fixed per deployment,
    /// independent of the per-request chunk size.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            overlap: default_overlap(),
        }
    }
}

fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `builtin` (deterministic, offline) or `openai`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            endpoint: default_embedding_endpoint(),
            model: None,
            dims: default_embedding_dims(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "builtin".to_string()
}
fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}
fn default_embedding_dims() -> usize {
    256
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            name: default_model_name(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

fn default_model_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_model_name() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_model_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    /// Directory where terminal conversation states are written, one JSON
    /// file per conversation id.
    #[serde(default = "default_conversations_dir")]
    pub conversations: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            conversations: default_conversations_dir(),
        }
    }
}

fn default_conversations_dir() -> PathBuf {
    PathBuf::from("./data/conversations")
}

/// Inclusive `[min, max]` bounds for one tunable setting.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Bound<T> {
    pub min: T,
    pub max: T,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_chunk_size_bound")]
    pub chunk_size: Bound<usize>,
    #[serde(default = "default_max_token_bound")]
    pub max_token_length: Bound<u32>,
    #[serde(default = "default_temperature_bound")]
    pub temperature: Bound<f32>,
    #[serde(default = "default_top_p_bound")]
    pub top_p: Bound<f32>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size_bound(),
            max_token_length: default_max_token_bound(),
            temperature: default_temperature_bound(),
            top_p: default_top_p_bound(),
        }
    }
}

fn default_chunk_size_bound() -> Bound<usize> {
    Bound { min: 300, max: 4000 }
}
fn default_max_token_bound() -> Bound<u32> {
    Bound { min: 1, max: 4096 }
}
fn default_temperature_bound() -> Bound<f32> {
    Bound { min: 0.0, max: 2.0 }
}
fn default_top_p_bound() -> Bound<f32> {
    Bound { min: 0.0, max: 1.0 }
}

impl LimitsConfig {
    /// Reject settings outside the configured bounds before they reach the
    /// pipeline.
    pub fn check(&self, settings: &Settings) -> Result<(), PipelineError> {
        check_bound("chunkSize", settings.chunk_size, &self.chunk_size)?;
        check_bound(
            "maxTokenLength",
            settings.max_token_length,
            &self.max_token_length,
        )?;
        check_bound("temperature", settings.temperature, &self.temperature)?;
        check_bound("topP", settings.top_p, &self.top_p)?;
        Ok(())
    }
}

fn check_bound<T: PartialOrd + std::fmt::Display>(
    name: &str,
    value: T,
    bound: &Bound<T>,
) -> Result<(), PipelineError> {
    if value < bound.min || value > bound.max {
        return Err(PipelineError::validation(format!(
            "{} must be between {} and {}, got {}",
            name, bound.min, bound.max, value
        )));
    }
    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // The stride (chunk_size - overlap) must stay positive for every
    // chunk size the limits admit.
    if config.chunking.overlap >= config.limits.chunk_size.min {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than limits.chunk_size.min ({})",
            config.chunking.overlap,
            config.limits.chunk_size.min
        );
    }

    match config.storage.backend.as_str() {
        "filesystem" => {}
        "http" => {
            if config.storage.base_url.is_none() {
                anyhow::bail!("storage.base_url is required when storage.backend is 'http'");
            }
        }
        other => anyhow::bail!(
            "Unknown storage backend: '{}'. Must be filesystem or http.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "builtin" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be builtin or openai.",
            other
        ),
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.storage.backend, "filesystem");
        assert!(config.limits.check(&Settings::default()).is_ok());
    }

    #[test]
    fn out_of_bounds_settings_rejected() {
        let limits = LimitsConfig::default();
        let settings = Settings {
            temperature: 3.5,
            ..Settings::default()
        };
        let err = limits.check(&settings).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn chunk_size_below_min_rejected() {
        let limits = LimitsConfig::default();
        let settings = Settings {
            chunk_size: 10,
            ..Settings::default()
        };
        assert!(limits.check(&settings).is_err());
    }
}
