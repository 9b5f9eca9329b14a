//! Vector index collaborator.
//!
//! The [`VectorIndex`] trait is the namespaced retrieval surface the
//! pipeline talks to: `upsert` embedded chunks, `similarity_search` text
//! queries. The bundled [`InMemoryIndex`] pairs an [`EmbeddingClient`]
//! with a brute-force cosine scan behind an `RwLock`, which is plenty for
//! one installation's document set and for the test suite.
//!
//! Record ids are deterministic (SHA-256 over namespace, source, index,
//! and text), so re-ingesting a file replaces its records in place
//! instead of accumulating duplicates.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::embedding::EmbeddingClient;
use crate::error::PipelineError;
use crate::models::{Credential, DocumentChunk, EmbeddingRecord, ScoredMatch};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and store a batch of chunks under a namespace.
    async fn upsert(
        &self,
        chunks: &[DocumentChunk],
        namespace: &str,
        credential: &Credential,
    ) -> Result<(), PipelineError>;

    /// Top-`k` most similar chunks for a text query within a namespace,
    /// ranked by descending score.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        namespace: &str,
        credential: &Credential,
    ) -> Result<Vec<ScoredMatch>, PipelineError>;
}

/// Deterministic identity of one stored chunk within a namespace.
pub fn record_id(namespace: &str, source_filename: &str, chunk_index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update([0u8]);
    hasher.update(source_filename.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk_index.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// In-memory cosine-similarity index, partitioned by namespace.
pub struct InMemoryIndex {
    embedder: Arc<dyn EmbeddingClient>,
    records: RwLock<HashMap<String, Vec<EmbeddingRecord>>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            embedder,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records stored under a namespace.
    pub fn record_count(&self, namespace: &str) -> usize {
        self.records
            .read()
            .unwrap()
            .get(namespace)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(
        &self,
        chunks: &[DocumentChunk],
        namespace: &str,
        credential: &Credential,
    ) -> Result<(), PipelineError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts, credential).await?;
        if vectors.len() != chunks.len() {
            return Err(PipelineError::upstream(
                "index",
                format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                ),
            ));
        }

        let new_records: Vec<EmbeddingRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord {
                id: record_id(namespace, &chunk.source_filename, chunk.chunk_index, &chunk.text),
                text: chunk.text.clone(),
                vector,
                source_filename: chunk.source_filename.clone(),
                chunk_index: chunk.chunk_index,
                namespace: namespace.to_string(),
            })
            .collect();

        let mut records = self.records.write().unwrap();
        let stored = records.entry(namespace.to_string()).or_default();
        let new_ids: Vec<&str> = new_records.iter().map(|r| r.id.as_str()).collect();
        stored.retain(|r| !new_ids.contains(&r.id.as_str()));
        stored.extend(new_records);
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        namespace: &str,
        credential: &Credential,
    ) -> Result<Vec<ScoredMatch>, PipelineError> {
        let query_vec = self
            .embedder
            .embed(&[query.to_string()], credential)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::upstream("index", "empty embedding response"))?;

        let records = self.records.read().unwrap();
        let Some(stored) = records.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredMatch> = stored
            .iter()
            .map(|r| ScoredMatch {
                chunk: DocumentChunk {
                    source_filename: r.source_filename.clone(),
                    text: r.text.clone(),
                    chunk_index: r.chunk_index,
                },
                score: cosine_similarity(&query_vec, &r.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for mismatched or empty
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let denom = norm_a * norm_b;
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
