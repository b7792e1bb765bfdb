use std::path::Path;

use thiserror::Error;

/// Extraction failures are hard errors for the caller: the scoring core
/// cannot work with blank input, so there is no degraded path here.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to extract text from PDF: {0}")]
    Parse(String),

    #[error("document contains no extractable text")]
    Empty,
}

/// Best-effort text extraction from a stored resume PDF. Page text is
/// concatenated by the underlying extractor.
pub fn extract_text_from_pdf(path: &Path) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text(path).map_err(|err| ExtractError::Parse(err.to_string()))?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}
