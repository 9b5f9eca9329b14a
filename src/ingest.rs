//! Document ingestion pipeline.
//!
//! For each requested file, in order: fetch the raw bytes from object
//! storage, extract text page by page (pages concatenated with no
//! separator), and split the blob into overlapping chunks. All chunks are
//! then embedded and upserted into the vector index in fixed-size batches,
//! strictly sequentially (batch N+1 does not start until batch N's upsert
//! has landed), keeping reported progress monotonic and bounding load on
//! the embedding service.
//!
//! Progress frames reserve the first 30 points for extraction and
//! splitting; batches advance `30 + ceil(70 · processed / total)` up to
//! 100. Whatever happens, [`run_with_completion`] emits the terminal
//! sentinel exactly once so caller read-loops always terminate.

use crate::chunk::split_overlapping;
use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::extract;
use crate::index::VectorIndex;
use crate::models::{Credential, DocumentChunk, Settings};
use crate::progress::{IngestFrame, ProgressReporter};
use crate::storage::ObjectStorage;
use serde::Deserialize;

/// Chunks embedded and upserted per batch.
pub const EMBED_BATCH_SIZE: usize = 50;

/// One file to ingest, by storage filename.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub files: Vec<FileRef>,
    pub settings: Settings,
    pub namespace: String,
    pub credential: Credential,
}

/// Collaborators and fixed parameters for one ingestion run.
pub struct IngestDeps<'a> {
    pub storage: &'a dyn ObjectStorage,
    pub index: &'a dyn VectorIndex,
    pub limits: &'a LimitsConfig,
    /// Fixed path prefix prepended to every filename.
    pub document_prefix: &'a str,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub files: usize,
    pub chunks: usize,
    pub batches: usize,
}

/// Run the pipeline and unconditionally emit the terminal sentinel.
///
/// Failures are reported as a serialized error frame before the sentinel
/// and returned to the caller untouched.
pub async fn run_with_completion(
    deps: &IngestDeps<'_>,
    request: &IngestRequest,
    reporter: &dyn ProgressReporter,
) -> Result<IngestSummary, PipelineError> {
    let result = run(deps, request, reporter).await;
    if let Err(err) = &result {
        tracing::warn!(error = %err, "ingestion failed");
        reporter.report(IngestFrame::Failure(err.serialized()));
    }
    reporter.report(IngestFrame::Done);
    result
}

async fn run(
    deps: &IngestDeps<'_>,
    request: &IngestRequest,
    reporter: &dyn ProgressReporter,
) -> Result<IngestSummary, PipelineError> {
    if request.files.is_empty() {
        return Err(PipelineError::validation("files must not be empty"));
    }
    deps.limits.check(&request.settings)?;
    let chunk_size = request.settings.chunk_size;
    if chunk_size <= deps.overlap {
        return Err(PipelineError::validation(format!(
            "chunkSize ({}) must be larger than the configured overlap ({})",
            chunk_size, deps.overlap
        )));
    }

    let mut all_chunks: Vec<DocumentChunk> = Vec::new();
    for file in &request.files {
        let path = format!("{}{}", deps.document_prefix, file.filename);
        let bytes = deps.storage.read_object(&path).await?;
        let pages = extract::extract_pages(&bytes, &file.filename)
            .map_err(|e| PipelineError::upstream("extractor", e))?;
        let blob = extract::concat_pages(&pages);
        let chunks = split_overlapping(&file.filename, &blob, chunk_size, deps.overlap)?;
        tracing::debug!(
            file = %file.filename,
            pages = pages.len(),
            chunks = chunks.len(),
            "extracted document"
        );
        all_chunks.extend(chunks);
    }

    let total = all_chunks.len();
    let mut processed = 0usize;
    let mut batches = 0usize;

    for batch in all_chunks.chunks(EMBED_BATCH_SIZE) {
        deps.index
            .upsert(batch, &request.namespace, &request.credential)
            .await?;
        processed += batch.len();
        batches += 1;
        reporter.report(IngestFrame::Progress(progress_percent(processed, total)));
    }

    tracing::info!(
        namespace = %request.namespace,
        files = request.files.len(),
        chunks = total,
        "ingestion complete"
    );

    Ok(IngestSummary {
        files: request.files.len(),
        chunks: total,
        batches,
    })
}

/// `30 + ceil(70 · processed / total)`; the first 30 points stand for
/// extraction and splitting. `total` must be non-zero.
fn progress_percent(processed: usize, total: usize) -> u8 {
    (30 + (70 * processed + total - 1) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_reaches_exactly_100() {
        assert_eq!(progress_percent(120, 120), 100);
    }

    #[test]
    fn progress_starts_above_30() {
        assert_eq!(progress_percent(50, 120), 60);
        assert!(progress_percent(1, 1000) > 30);
    }

    #[test]
    fn progress_is_monotonic() {
        let total = 137;
        let mut last = 0;
        for processed in (50..=total).step_by(50).chain(std::iter::once(total)) {
            let pct = progress_percent(processed.min(total), total);
            assert!(pct >= last);
            last = pct;
        }
        assert_eq!(last, 100);
    }
}
