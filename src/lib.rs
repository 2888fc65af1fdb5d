//! # assignforge
//!
//! Generate academic assignment documents from PDF source material using
//! LLMs, with PDF and ODT output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract   pull the text layer out of the uploaded PDF
//!  ├─ 2. Analyse   one LLM pass: summary, key topics, ambiguities
//!  ├─ 3. Clarify   the user answers the ambiguities (optional)
//!  ├─ 4. Generate  one LLM pass: structured assignment text
//!  └─ 5. Compose   cover page + styled body → PDF or ODT bytes
//! ```
//!
//! The flow is strictly linear and synchronous: each step is a pure function
//! of its inputs (given a deterministic LLM client) returning an explicit
//! `Result`, and the only state is the single [`session::Session`] the
//! presentation layer carries between steps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use assignforge::{
//!     create_assignment_odt, run_analysis, run_assignment, AssignmentMetadata,
//!     GenerationConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENROUTER_API_KEY from the environment.
//!     let config = GenerationConfig::default();
//!     let bytes = std::fs::read("syllabus.pdf")?;
//!     let text = assignforge::extract_pdf_text(&bytes)?;
//!
//!     let analysis = run_analysis(&text, "Answer question 3", &config).await?;
//!     println!("{analysis}");
//!
//!     let assignment = run_assignment(&text, "Answer question 3", "", &config).await?;
//!     let meta = AssignmentMetadata::new("Question 3 Essay");
//!     let odt = create_assignment_odt(&meta, &assignment)?;
//!     std::fs::write("essay.odt", odt)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `assignforge` binary (clap + anyhow + tracing-subscriber) |
//! | `web`   | via `cli` | Enables the axum web form ([`web`]) |
//!
//! Disable both when using only the library:
//! ```toml
//! assignforge = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compose;
pub mod config;
pub mod error;
pub mod generate;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod session;
#[cfg(feature = "web")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compose::{Artifact, AssignmentMetadata, OutputFormat, PdfOptions};
pub use config::{GenerationConfig, GenerationConfigBuilder, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
pub use error::{ErrorKind, ForgeError};
pub use generate::{
    compose_document, create_assignment_odt, create_assignment_pdf, extract_pdf_text,
    run_analysis, run_assignment, write_artifact,
};
pub use llm::{ChatMessage, ChatRequest, LlmClient, OpenRouterClient};
pub use pipeline::markup::Block;
pub use session::{Phase, Session};
