//! Error types for the assignforge library.
//!
//! One enum, three user-visible failure families:
//!
//! * **Extraction** — the uploaded PDF could not be turned into text
//!   (not a PDF, corrupt, or image-only with no text layer).
//! * **Generation** — the LLM call failed (missing/invalid key, transport
//!   failure, provider-side rejection). The pipeline makes exactly one
//!   attempt; the error is surfaced with a human-readable message and the
//!   caller decides whether to repeat the action.
//! * **Composition** — the generated text could not be rendered into a
//!   PDF/ODT byte stream, or the artifact could not be written to disk.
//!
//! The flat enum (rather than one error type per stage) keeps the
//! presentation layer trivial: every handler maps a `ForgeError` to a single
//! visible message, and [`ForgeError::kind`] tells it which family to label
//! the message with.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`ForgeError`], used by the presentation layer
/// to label the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Extraction,
    Generation,
    Composition,
    Config,
}

impl ErrorKind {
    /// Human-readable label for UI messages.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Extraction => "extraction failed",
            ErrorKind::Generation => "generation failed",
            ErrorKind::Composition => "composition failed",
            ErrorKind::Config => "invalid configuration",
        }
    }
}

/// All errors returned by the assignforge library.
#[derive(Debug, Error)]
pub enum ForgeError {
    // ── Extraction errors ────────────────────────────────────────────────
    /// The uploaded bytes do not start with the PDF magic header.
    #[error("Uploaded file is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    /// The PDF parser rejected the document.
    #[error("Could not read PDF: {detail}\nThe file may be corrupt or encrypted.")]
    ExtractionFailed { detail: String },

    /// Parsing succeeded but produced no text at all.
    #[error(
        "The PDF contains no extractable text.\n\
         Scanned/image-only documents are not supported — export a text-based PDF and retry."
    )]
    EmptyDocument,

    // ── Generation errors ────────────────────────────────────────────────
    /// No API key was configured or found in the environment.
    #[error(
        "OPENROUTER_API_KEY is not set.\n\
         Export it or add it to a .env file before generating."
    )]
    MissingApiKey,

    /// The provider rejected the credentials (HTTP 401/403).
    #[error("Authentication with the LLM provider failed (HTTP {status}): {detail}")]
    AuthFailed { status: u16, detail: String },

    /// The provider rejected the request for quota reasons (HTTP 429).
    #[error("The LLM provider rate-limited the request: {detail}")]
    RateLimited { detail: String },

    /// Transport-level failure talking to the provider.
    #[error("Network error calling the LLM provider: {detail}\nCheck your internet connection.")]
    Network { detail: String },

    /// The request exceeded the configured per-call timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// Any other non-success response from the provider.
    #[error("LLM provider returned an error (HTTP {status}): {detail}")]
    ApiError { status: u16, detail: String },

    /// The response was 2xx but carried no usable completion.
    #[error("LLM provider returned an empty or malformed response: {detail}")]
    EmptyCompletion { detail: String },

    // ── Composition errors ───────────────────────────────────────────────
    /// PDF assembly failed.
    #[error("PDF composition failed: {detail}")]
    PdfCompose { detail: String },

    /// ODT assembly failed.
    #[error("ODT composition failed: {detail}")]
    OdtCompose { detail: String },

    /// Could not write the finished artifact to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ForgeError {
    /// Which user-visible family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForgeError::NotAPdf { .. }
            | ForgeError::ExtractionFailed { .. }
            | ForgeError::EmptyDocument => ErrorKind::Extraction,

            ForgeError::MissingApiKey
            | ForgeError::AuthFailed { .. }
            | ForgeError::RateLimited { .. }
            | ForgeError::Network { .. }
            | ForgeError::ApiTimeout { .. }
            | ForgeError::ApiError { .. }
            | ForgeError::EmptyCompletion { .. } => ErrorKind::Generation,

            ForgeError::PdfCompose { .. }
            | ForgeError::OdtCompose { .. }
            | ForgeError::OutputWrite { .. } => ErrorKind::Composition,

            ForgeError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// True when the failure is credential-related (useful for the UI to
    /// point at the API key specifically).
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ForgeError::MissingApiKey | ForgeError::AuthFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_display_mentions_authentication() {
        let e = ForgeError::AuthFailed {
            status: 401,
            detail: "invalid key".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Authentication"), "got: {msg}");
        assert!(msg.contains("401"));
        assert!(e.is_auth());
        assert_eq!(e.kind(), ErrorKind::Generation);
    }

    #[test]
    fn missing_key_is_auth_and_actionable() {
        let e = ForgeError::MissingApiKey;
        assert!(e.is_auth());
        assert!(e.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn kinds_cover_all_families() {
        assert_eq!(ForgeError::EmptyDocument.kind(), ErrorKind::Extraction);
        assert_eq!(
            ForgeError::RateLimited {
                detail: "slow down".into()
            }
            .kind(),
            ErrorKind::Generation
        );
        assert_eq!(
            ForgeError::OdtCompose {
                detail: "bad zip".into()
            }
            .kind(),
            ErrorKind::Composition
        );
        assert_eq!(
            ForgeError::InvalidConfig("temp".into()).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn timeout_display() {
        let e = ForgeError::ApiTimeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
    }
}
