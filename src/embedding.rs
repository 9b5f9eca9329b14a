//! Embedding collaborator.
//!
//! Two providers:
//! - **[`BuiltinEmbeddings`]**: deterministic character-trigram hashing,
//!   fully offline. The default, and what the test suite runs against.
//! - **[`OpenAiEmbeddings`]**: calls an OpenAI-compatible `/embeddings`
//!   endpoint. One attempt per call; upstream failures surface verbatim
//!   and retry policy stays with the caller.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;
use crate::models::Credential;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(
        &self,
        texts: &[String],
        credential: &Credential,
    ) -> Result<Vec<Vec<f32>>, PipelineError>;

    fn dims(&self) -> usize;
}

// ============ Builtin provider ============

/// Deterministic offline embeddings: character trigrams hashed (FNV-1a)
/// into a fixed-dimension bag, L2-normalized. Not semantically deep, but
/// stable across processes, which is what the bundled index and the test
/// suite need.
pub struct BuiltinEmbeddings {
    dims: usize,
}

impl BuiltinEmbeddings {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.len() < 3 {
            let slot = (fnv1a(lowered.as_bytes()) as usize) % self.dims;
            vector[slot] = 1.0;
            return vector;
        }

        for window in chars.windows(3) {
            let gram: String = window.iter().collect();
            let slot = (fnv1a(gram.as_bytes()) as usize) % self.dims;
            vector[slot] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EmbeddingClient for BuiltinEmbeddings {
    async fn embed(
        &self,
        texts: &[String],
        _credential: &Credential,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

// ============ OpenAI-compatible provider ============

/// Embeddings from an OpenAI-compatible HTTP endpoint.
pub struct OpenAiEmbeddings {
    endpoint: String,
    model: String,
    dims: usize,
    default_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for openai provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model,
            dims: config.dims,
            default_key: std::env::var("OPENAI_API_KEY").ok(),
            client,
        })
    }

    fn resolve_key(&self, credential: &Credential) -> Result<String, PipelineError> {
        credential
            .token()
            .map(str::to_string)
            .or_else(|| self.default_key.clone())
            .ok_or_else(|| {
                PipelineError::upstream(
                    "embeddings",
                    "no API credential available (request credential or OPENAI_API_KEY)",
                )
            })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    async fn embed(
        &self,
        texts: &[String],
        credential: &Credential,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let key = self.resolve_key(credential)?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::upstream("embeddings", e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::upstream(
                "embeddings",
                format!("API error {}: {}", status, body_text),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("embeddings", e))?;
        parse_embedding_response(&json)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Extract `data[].embedding` arrays from an embeddings API response, in
/// input order.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, PipelineError> {
    let data = json.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
        PipelineError::upstream("embeddings", "invalid response: missing data array")
    })?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                PipelineError::upstream("embeddings", "invalid response: missing embedding")
            })?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        embeddings.push(vec);
    }

    Ok(embeddings)
}

/// Instantiate the embedding provider named in the configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingClient>> {
    match config.provider.as_str() {
        "builtin" => Ok(Arc::new(BuiltinEmbeddings::new(config.dims))),
        "openai" => Ok(Arc::new(OpenAiEmbeddings::new(config)?)),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}
