//! Per-page text extraction for uploaded documents.
//!
//! PDFs are extracted page by page; any other file is decoded as UTF-8 and
//! treated as a single page. Callers join pages with [`concat_pages`],
//! which inserts nothing between pages: the resulting blob is exactly
//! what naive page concatenation produces, a fidelity requirement for the
//! chunk reconstruction invariant.

/// Extraction error. The pipeline aborts the whole run on the first one.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Encoding(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Encoding(e) => write!(f, "text decoding failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the text of each page of a document, in page order.
pub fn extract_pages(bytes: &[u8], filename: &str) -> Result<Vec<String>, ExtractError> {
    if filename.to_lowercase().ends_with(".pdf") {
        extract_pdf_pages(bytes)
    } else {
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractError::Encoding(e.to_string()))?;
        Ok(vec![text])
    }
}

/// Join pages with no separator.
pub fn concat_pages(pages: &[String]) -> String {
    pages.concat()
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_page() {
        let pages = extract_pages(b"alpha beta", "notes.txt").unwrap();
        assert_eq!(pages, vec!["alpha beta".to_string()]);
    }

    #[test]
    fn invalid_utf8_returns_error() {
        let err = extract_pages(&[0xff, 0xfe, 0x00], "notes.txt").unwrap_err();
        assert!(matches!(err, ExtractError::Encoding(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pages(b"not a pdf", "doc.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn concat_inserts_nothing_between_pages() {
        let pages = vec!["first page".to_string(), "second page".to_string()];
        assert_eq!(concat_pages(&pages), "first pagesecond page");
    }
}
