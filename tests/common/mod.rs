//! Shared test doubles for the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chatdocs::error::PipelineError;
use chatdocs::index::VectorIndex;
use chatdocs::llm::{GenerationModel, ModelOutput};
use chatdocs::models::{Conversation, Credential, DocumentChunk, SamplingParams, ScoredMatch};
use chatdocs::playback::ConversationSink;
use chatdocs::storage::ObjectStorage;

/// Index double returning a fixed score for every query, or nothing.
pub struct StaticIndex {
    pub score: Option<f32>,
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn upsert(
        &self,
        _chunks: &[DocumentChunk],
        _namespace: &str,
        _credential: &Credential,
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn similarity_search(
        &self,
        _query: &str,
        k: usize,
        _namespace: &str,
        _credential: &Credential,
    ) -> Result<Vec<ScoredMatch>, PipelineError> {
        let Some(score) = self.score else {
            return Ok(Vec::new());
        };
        Ok((0..k)
            .map(|i| ScoredMatch {
                chunk: DocumentChunk {
                    source_filename: "manual.pdf".to_string(),
                    text: format!("supporting chunk {}", i + 1),
                    chunk_index: i,
                },
                score,
            })
            .collect())
    }
}

/// Generation model double that always answers with a canned reply and
/// counts its calls.
pub struct CannedModel {
    pub reply: String,
    pub calls: AtomicUsize,
}

impl CannedModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationModel for CannedModel {
    async fn complete(
        &self,
        _prompt: &str,
        _params: &SamplingParams,
        _credential: &Credential,
    ) -> Result<ModelOutput, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ModelOutput::single("text", self.reply.clone()))
    }
}

/// Sink double recording every persisted snapshot.
#[derive(Default)]
pub struct MemorySink {
    persisted: Mutex<Vec<Conversation>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist_count(&self) -> usize {
        self.persisted.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Conversation> {
        self.persisted.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConversationSink for MemorySink {
    async fn persist(&self, conversation: &Conversation) -> Result<(), PipelineError> {
        self.persisted.lock().unwrap().push(conversation.clone());
        Ok(())
    }
}

/// Storage wrapper counting every read, for asserting fail-fast behavior.
pub struct CountingStorage {
    inner: Arc<dyn ObjectStorage>,
    pub reads: AtomicUsize,
}

impl CountingStorage {
    pub fn new(inner: Arc<dyn ObjectStorage>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for CountingStorage {
    async fn read_object(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_object(path).await
    }

    async fn write_object(&self, path: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        self.inner.write_object(path, bytes).await
    }
}

/// Minimal two-page PDF with one text phrase per page, built with correct
/// xref byte offsets so the extractor can parse it.
pub fn two_page_pdf(page_one: &str, page_two: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let stream_one = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", page_one);
    let stream_two = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", page_two);

    let mut offsets = Vec::new();

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj\n");

    offsets.push(out.len());
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R /Resources << /Font << /F1 7 0 R >> >> >> endobj\n");

    offsets.push(out.len());
    out.extend_from_slice(b"4 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 6 0 R /Resources << /Font << /F1 7 0 R >> >> >> endobj\n");

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "5 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream_one.len(),
            stream_one
        )
        .as_bytes(),
    );

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "6 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream_two.len(),
            stream_two
        )
        .as_bytes(),
    );

    offsets.push(out.len());
    out.extend_from_slice(b"7 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n");

    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 8\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 8 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}
