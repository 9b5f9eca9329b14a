//! Fixed-stride overlapping text chunker.
//!
//! Splits a document's extracted text into chunks of `chunk_size`
//! characters where consecutive chunks share `overlap` characters. The
//! split is deterministic and loss-free: [`reconstruct`] restores the
//! original text exactly by dropping the leading `overlap` characters of
//! every chunk after the first.
//!
//! All arithmetic is in characters, not bytes, so multi-byte text never
//! splits inside a code point.

use crate::error::PipelineError;
use crate::models::DocumentChunk;

/// Split `text` into overlapping chunks attributed to `source_filename`.
///
/// Chunk `i` covers characters `[i * stride, i * stride + chunk_size)`
/// where `stride = chunk_size - overlap`. Indices are contiguous from 0.
/// Empty text yields no chunks.
pub fn split_overlapping(
    source_filename: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<DocumentChunk>, PipelineError> {
    if chunk_size == 0 {
        return Err(PipelineError::validation("chunkSize must be > 0"));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::validation(format!(
            "chunk overlap ({}) must be smaller than chunkSize ({})",
            overlap, chunk_size
        )));
    }

    // Byte offset of every character boundary, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    if char_count == 0 {
        return Ok(Vec::new());
    }

    let stride = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let end = (start + chunk_size).min(char_count);
        chunks.push(DocumentChunk {
            source_filename: source_filename.to_string(),
            text: text[boundaries[start]..boundaries[end]].to_string(),
            chunk_index: index,
        });
        if end == char_count {
            break;
        }
        start += stride;
        index += 1;
    }

    Ok(chunks)
}

/// Invert [`split_overlapping`]: concatenate chunks in index order,
/// dropping the first `overlap` characters of every chunk after the first.
pub fn reconstruct(chunks: &[DocumentChunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.text);
        } else {
            out.extend(chunk.text.chars().skip(overlap));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(chars: usize) -> String {
        (0..chars)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = split_overlapping("a.pdf", "Hello, world!", 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn empty_text_no_chunks() {
        let chunks = split_overlapping("a.pdf", "", 1000, 200).unwrap();
        assert!(chunks.is_empty());
        assert_eq!(reconstruct(&chunks, 200), "");
    }

    #[test]
    fn indices_contiguous_and_strided() {
        let text = sample_text(2500);
        let chunks = split_overlapping("a.pdf", &text, 1000, 200).unwrap();
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
        // Every chunk except possibly the last is exactly chunk_size chars.
        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.text.chars().count(), 1000);
        }
    }

    #[test]
    fn roundtrip_restores_text_exactly() {
        let text = sample_text(5321);
        let chunks = split_overlapping("a.pdf", &text, 1000, 200).unwrap();
        assert_eq!(reconstruct(&chunks, 200), text);
    }

    #[test]
    fn roundtrip_multibyte() {
        let text = "héllo wörld — ".repeat(300);
        let chunks = split_overlapping("a.pdf", &text, 1000, 200).unwrap();
        assert_eq!(reconstruct(&chunks, 200), text);
    }

    #[test]
    fn roundtrip_small_stride() {
        // Text length that does not land on a stride boundary.
        let text = sample_text(11);
        let chunks = split_overlapping("a.pdf", &text, 5, 2).unwrap();
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn deterministic() {
        let text = sample_text(3000);
        let a = split_overlapping("a.pdf", &text, 1000, 200).unwrap();
        let b = split_overlapping("a.pdf", &text, 1000, 200).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let err = split_overlapping("a.pdf", "text", 200, 200).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
