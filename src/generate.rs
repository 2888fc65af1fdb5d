//! Top-level pipeline entry points.
//!
//! These are the functions the presentation layer (web handlers, CLI) calls:
//! one per user action. Each is a thin orchestration over the pipeline
//! stages — extraction, prompt assembly, the LLM round-trip, markup parsing,
//! and composition — with no hidden state: every intermediate value is
//! passed explicitly, so each function is reproducible from its arguments
//! (and a deterministic client makes the LLM-backed ones pure).

use crate::compose::{self, Artifact, AssignmentMetadata, OutputFormat, PdfOptions};
use crate::config::GenerationConfig;
use crate::error::ForgeError;
use crate::llm::{ChatRequest, LlmClient, OpenRouterClient};
use crate::pipeline::{extract, markup};
use crate::prompts;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Extract the plain-text content of an uploaded PDF.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ForgeError> {
    extract::extract_text(bytes)
}

/// Resolve the LLM client, from most-specific to least-specific:
///
/// 1. **Pre-built client** (`config.client`) — the caller constructed it;
///    used as-is. This is how tests inject deterministic stubs.
/// 2. **Explicit key** (`config.api_key`) — build an [`OpenRouterClient`]
///    against `config.base_url`.
/// 3. **Environment** — `OPENROUTER_API_KEY` (error if absent).
fn resolve_client(config: &GenerationConfig) -> Result<Arc<dyn LlmClient>, ForgeError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }
    if let Some(ref key) = config.api_key {
        return Ok(Arc::new(OpenRouterClient::new(
            config.base_url.clone(),
            key.clone(),
            config.api_timeout_secs,
        )?));
    }
    Ok(Arc::new(OpenRouterClient::from_env(
        config.api_timeout_secs,
    )?))
}

async fn complete(
    config: &GenerationConfig,
    messages: Vec<crate::llm::ChatMessage>,
) -> Result<String, ForgeError> {
    let client = resolve_client(config)?;
    let request = ChatRequest {
        model: config.model.clone(),
        messages,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let start = Instant::now();
    let completion = client.complete(&request).await?;
    info!(
        model = %request.model,
        prompt_tokens = completion.usage.prompt_tokens,
        completion_tokens = completion.usage.completion_tokens,
        duration_ms = start.elapsed().as_millis() as u64,
        "LLM call finished"
    );
    Ok(completion.content)
}

/// Run the analysis pass: summary, key topics, explicit instructions and
/// ambiguities for the uploaded document.
///
/// Empty `instructions` are fine — they degrade to "None provided." in the
/// prompt. Empty `document_text` is not: analysis without a source document
/// is meaningless.
pub async fn run_analysis(
    document_text: &str,
    instructions: &str,
    config: &GenerationConfig,
) -> Result<String, ForgeError> {
    if document_text.trim().is_empty() {
        return Err(ForgeError::EmptyDocument);
    }
    complete(config, prompts::analysis_messages(document_text, instructions, "")).await
}

/// Run the assignment-generation pass with optional clarifications from the
/// analysis step.
pub async fn run_assignment(
    document_text: &str,
    instructions: &str,
    clarifications: &str,
    config: &GenerationConfig,
) -> Result<String, ForgeError> {
    if document_text.trim().is_empty() {
        return Err(ForgeError::EmptyDocument);
    }
    complete(
        config,
        prompts::assignment_messages(document_text, instructions, clarifications),
    )
    .await
}

/// Render generated assignment text into a PDF with cover page.
pub fn create_assignment_pdf(
    meta: &AssignmentMetadata,
    assignment_text: &str,
    options: &PdfOptions,
) -> Result<Vec<u8>, ForgeError> {
    let blocks = markup::blocks_from_generated(assignment_text);
    compose::pdf::compose(meta, &blocks, options)
}

/// Render generated assignment text into an ODT with cover page.
pub fn create_assignment_odt(
    meta: &AssignmentMetadata,
    assignment_text: &str,
) -> Result<Vec<u8>, ForgeError> {
    let blocks = markup::blocks_from_generated(assignment_text);
    compose::odt::compose(meta, &blocks)
}

/// Render into the requested format and tag the result.
pub fn compose_document(
    format: OutputFormat,
    meta: &AssignmentMetadata,
    assignment_text: &str,
    pdf_options: &PdfOptions,
) -> Result<Artifact, ForgeError> {
    let bytes = match format {
        OutputFormat::Pdf => create_assignment_pdf(meta, assignment_text, pdf_options)?,
        OutputFormat::Odt => create_assignment_odt(meta, assignment_text)?,
    };
    Ok(Artifact { bytes, format })
}

/// Write an artifact to disk atomically (temp file + rename), so a crash
/// mid-write never leaves a truncated document behind.
pub async fn write_artifact(artifact: &Artifact, path: impl AsRef<Path>) -> Result<(), ForgeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ForgeError::OutputWrite {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension(format!("{}.tmp", artifact.format.extension()));
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(|e| ForgeError::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ForgeError::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!(path = %path.display(), bytes = artifact.bytes.len(), "Wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatCompletion, Usage};
    use async_trait::async_trait;

    /// Echoes a digest of the request back — deterministic by construction.
    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ForgeError> {
            let user = request
                .messages
                .iter()
                .find(|m| m.role == "user")
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatCompletion {
                content: format!("# Echo\n\n{}", &user[..user.len().min(80)]),
                usage: Usage::default(),
            })
        }
    }

    struct AuthFailClient;

    #[async_trait]
    impl LlmClient for AuthFailClient {
        async fn complete(&self, _request: &ChatRequest) -> Result<ChatCompletion, ForgeError> {
            Err(ForgeError::AuthFailed {
                status: 401,
                detail: "invalid api key".into(),
            })
        }
    }

    fn stub_config(client: Arc<dyn LlmClient>) -> GenerationConfig {
        GenerationConfig::builder().client(client).build().unwrap()
    }

    #[tokio::test]
    async fn run_analysis_rejects_empty_document() {
        let config = stub_config(Arc::new(EchoClient));
        let err = run_analysis("   ", "instr", &config).await.unwrap_err();
        assert!(matches!(err, ForgeError::EmptyDocument));
    }

    #[tokio::test]
    async fn run_analysis_is_deterministic_with_stub() {
        let config = stub_config(Arc::new(EchoClient));
        let a = run_analysis("Document body", "Do X", &config).await.unwrap();
        let b = run_analysis("Document body", "Do X", &config).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn run_assignment_passes_clarifications_through() {
        let config = stub_config(Arc::new(EchoClient));
        let out = run_assignment("Doc", "Instr", "clarified", &config)
            .await
            .unwrap();
        assert!(out.starts_with("# Echo"));
    }

    #[tokio::test]
    async fn auth_failure_surfaces_as_generation_error() {
        let config = stub_config(Arc::new(AuthFailClient));
        let err = run_analysis("Doc", "", &config).await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().to_lowercase().contains("authentication"));
    }

    #[test]
    fn resolve_client_prefers_injected_stub() {
        let config = stub_config(Arc::new(EchoClient));
        assert!(resolve_client(&config).is_ok());
    }

    #[test]
    fn compose_document_tags_the_format() {
        let meta = AssignmentMetadata::new("T");
        let artifact = compose_document(
            OutputFormat::Odt,
            &meta,
            "# H\n\nbody",
            &PdfOptions::default(),
        )
        .unwrap();
        assert_eq!(artifact.format, OutputFormat::Odt);
        assert_eq!(&artifact.bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn write_artifact_is_atomic_and_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.odt");
        let artifact = Artifact {
            bytes: b"PKfake".to_vec(),
            format: OutputFormat::Odt,
        };
        write_artifact(&artifact, &path).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"PKfake");
        // No stray temp file left behind.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
