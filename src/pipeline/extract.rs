//! Text extraction: PDF bytes → plain text.
//!
//! We validate the `%PDF` magic bytes before handing the buffer to the
//! parser so callers get a meaningful error rather than a parser backtrace,
//! then run `pdf-extract` directly over the in-memory bytes (no temp file
//! needed — the whole upload already lives in memory).
//!
//! A PDF whose text layer is empty (scanned pages, pure images) is an error
//! here, not later: sending an empty document to the LLM would produce a
//! hallucinated assignment with no source grounding.

use crate::error::ForgeError;
use tracing::{debug, info};

/// Extract all text from a PDF given its binary content.
///
/// Page boundaries (form feeds) are normalised to blank lines so downstream
/// prompt assembly sees ordinary paragraph breaks.
pub fn extract_text(bytes: &[u8]) -> Result<String, ForgeError> {
    check_magic(bytes)?;

    let raw = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        ForgeError::ExtractionFailed {
            detail: e.to_string(),
        }
    })?;

    let text = normalise(&raw);
    if text.is_empty() {
        return Err(ForgeError::EmptyDocument);
    }

    info!(bytes = bytes.len(), chars = text.len(), "Extracted PDF text");
    Ok(text)
}

/// Reject anything that does not start with the PDF header.
fn check_magic(bytes: &[u8]) -> Result<(), ForgeError> {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    if &magic != b"%PDF" {
        debug!(?magic, "Rejected non-PDF upload");
        return Err(ForgeError::NotAPdf { magic });
    }
    Ok(())
}

/// Replace form feeds with paragraph breaks and trim the result.
fn normalise(raw: &str) -> String {
    raw.replace('\u{0C}', "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pdf_bytes_are_rejected() {
        let err = extract_text(b"GIF89a....").unwrap_err();
        assert!(matches!(err, ForgeError::NotAPdf { .. }));
    }

    #[test]
    fn short_input_is_rejected_not_panicking() {
        let err = extract_text(b"%P").unwrap_err();
        assert!(matches!(err, ForgeError::NotAPdf { .. }));
        let err = extract_text(b"").unwrap_err();
        assert!(matches!(err, ForgeError::NotAPdf { .. }));
    }

    #[test]
    fn form_feeds_become_paragraph_breaks() {
        assert_eq!(normalise("page one\u{0C}page two"), "page one\n\npage two");
    }

    #[test]
    fn normalise_trims_surrounding_whitespace() {
        assert_eq!(normalise("\n\n  hello  \n\n"), "hello");
    }
}
