//! CLI binary for assignforge.
//!
//! A thin shim over the library crate: maps flags to `GenerationConfig`,
//! drives the pipeline, and prints or writes results.

use anyhow::{bail, Context, Result};
use assignforge::{
    compose_document, extract_pdf_text, run_analysis, run_assignment, write_artifact,
    AssignmentMetadata, GenerationConfig, OutputFormat, PdfOptions,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a PDF (prints the analysis to stdout)
  assignforge analyze syllabus.pdf --instructions "Answer question 3"

  # Full pipeline: analyse silently, generate, write an ODT
  assignforge generate syllabus.pdf \
      --instructions "Answer question 3" \
      --clarifications "Use APA citations" \
      --name "Jane Doe" --registration "REG-42" \
      --title "Question 3 Essay" -o essay.odt

  # Same document as a PDF with a cover logo
  assignforge generate syllabus.pdf -o essay.pdf --logo university.png

  # Offline composer check — no API key, no network
  assignforge compose -o sample.odt
  assignforge compose --text my_assignment.md -o out.pdf

  # Start the web form
  assignforge serve --bind 127.0.0.1:8080

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY       OpenRouter API key (required for analyze/generate/serve)
  ASSIGNFORGE_MODEL        Override the default model
  ASSIGNFORGE_BASE_URL     Alternative OpenAI-compatible endpoint
  ASSIGNFORGE_BIND         Default bind address for `serve`

A .env file in the working directory is loaded automatically.

SETUP:
  1. Set API key:   export OPENROUTER_API_KEY=sk-or-...
  2. Generate:      assignforge generate document.pdf -o assignment.odt
"#;

/// Generate academic assignment documents from PDF source material.
#[derive(Parser, Debug)]
#[command(
    name = "assignforge",
    version,
    about = "Generate academic assignment documents (PDF/ODT) from PDF source material using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID on OpenRouter.
    #[arg(long, global = true, env = "ASSIGNFORGE_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Max tokens the model may generate.
    #[arg(long, global = true)]
    max_tokens: Option<usize>,

    /// Per-request LLM timeout in seconds.
    #[arg(long, global = true, default_value_t = 120)]
    api_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a PDF: summary, key topics, ambiguities.
    Analyze {
        /// Path to the source PDF.
        pdf: PathBuf,

        /// Assignment questions or instructions.
        #[arg(short, long, default_value = "")]
        instructions: String,

        /// Print the analysis as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },

    /// Run the full pipeline and write a finished document.
    Generate {
        /// Path to the source PDF.
        pdf: PathBuf,

        /// Assignment questions or instructions.
        #[arg(short, long, default_value = "")]
        instructions: String,

        /// Clarifications resolving ambiguities (normally gathered after an
        /// `analyze` run).
        #[arg(short, long, default_value = "")]
        clarifications: String,

        /// Output path; the extension picks the format (.pdf or .odt).
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        meta: MetaArgs,

        #[command(flatten)]
        pdf_opts: PdfArgs,
    },

    /// Compose a document from existing text — no LLM call, no API key.
    ///
    /// With no --text file, a built-in sample assignment is used, so this
    /// doubles as an offline smoke test of the composers.
    Compose {
        /// Text file with the assignment body (lightweight markup).
        #[arg(long)]
        text: Option<PathBuf>,

        /// Output path; the extension picks the format (.pdf or .odt).
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        meta: MetaArgs,

        #[command(flatten)]
        pdf_opts: PdfArgs,
    },

    /// Start the web form.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080", env = "ASSIGNFORGE_BIND")]
        bind: String,
    },
}

/// Cover-page metadata flags shared by `generate` and `compose`.
#[derive(Args, Debug)]
struct MetaArgs {
    /// Assignment title for the cover page.
    #[arg(long, default_value = "Assignment")]
    title: String,

    /// Student's full name.
    #[arg(long)]
    name: Option<String>,

    /// Registration or student ID number.
    #[arg(long = "registration")]
    registration_number: Option<String>,

    /// Course instructor's name.
    #[arg(long = "instructor")]
    instructor_name: Option<String>,

    /// Semester or term.
    #[arg(long)]
    semester: Option<String>,

    /// University or institution name.
    #[arg(long = "university")]
    university_name: Option<String>,
}

impl From<MetaArgs> for AssignmentMetadata {
    fn from(args: MetaArgs) -> Self {
        AssignmentMetadata {
            title: args.title,
            name: args.name,
            registration_number: args.registration_number,
            instructor_name: args.instructor_name,
            semester: args.semester,
            university_name: args.university_name,
        }
    }
}

/// PDF-only composer flags.
#[derive(Args, Debug)]
struct PdfArgs {
    /// PNG/JPEG logo for the PDF cover page (ignored for ODT output).
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Omit the "Page N" footer on PDF content pages.
    #[arg(long)]
    no_page_numbers: bool,
}

impl PdfArgs {
    fn into_options(self) -> Result<PdfOptions> {
        let logo = match self.logo {
            Some(path) => Some(
                std::fs::read(&path)
                    .with_context(|| format!("Failed to read logo {}", path.display()))?,
            ),
            None => None,
        };
        Ok(PdfOptions {
            logo,
            include_page_numbers: !self.no_page_numbers,
        })
    }
}

/// Sample assignment body for the offline `compose` check.
const SAMPLE_ASSIGNMENT: &str = r#"# Introduction

This is a sample assignment that exercises every formatting element the
composers support: headings at three levels, body paragraphs, and both list
kinds.

## Literature Review

The literature review section examines existing research in the field.
According to various studies, the following points are important:

- First key finding from the literature
- Second important discovery
- Third significant observation

### Methodology

The methodology section describes the approach taken for this research:

1. Data collection phase
2. Analysis and processing
3. Results interpretation
4. Conclusion formulation

## Conclusion

In conclusion, this document demonstrates a well-structured academic layout.
Both output formats preserve the block order and heading hierarchy above.

## References

1. Smith, J. (2023). Academic Writing in the Digital Age. Journal of Educational Technology.
2. Johnson, M. & Brown, L. (2022). Document Formatting Standards. Academic Press.
"#;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match cli.command {
        Command::Analyze {
            ref pdf,
            ref instructions,
            json,
        } => {
            let text = extract_with_feedback(pdf, cli.quiet)?;
            let spinner = spinner(cli.quiet, "Analysing document…");
            let analysis = run_analysis(&text, instructions, &config)
                .await
                .context("Analysis failed")?;
            finish_spinner(spinner);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "model": config.model,
                        "analysis": analysis,
                    }))?
                );
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(analysis.as_bytes())?;
                if !analysis.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }

        Command::Generate {
            ref pdf,
            ref instructions,
            ref clarifications,
            ref output,
            meta,
            pdf_opts,
        } => {
            let format = format_from_path(output)?;
            let text = extract_with_feedback(pdf, cli.quiet)?;

            let spinner = spinner(cli.quiet, "Generating assignment…");
            let assignment = run_assignment(&text, instructions, clarifications, &config)
                .await
                .context("Assignment generation failed")?;
            finish_spinner(spinner);

            let metadata: AssignmentMetadata = meta.into();
            let artifact =
                compose_document(format, &metadata, &assignment, &pdf_opts.into_options()?)
                    .context("Composition failed")?;
            write_artifact(&artifact, output).await?;
            if !cli.quiet {
                eprintln!(
                    "✔ {} bytes → {}",
                    artifact.bytes.len(),
                    output.display()
                );
            }
        }

        Command::Compose {
            ref text,
            ref output,
            meta,
            pdf_opts,
        } => {
            let format = format_from_path(output)?;
            let body = match text {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => SAMPLE_ASSIGNMENT.to_string(),
            };

            let metadata: AssignmentMetadata = meta.into();
            let artifact = compose_document(format, &metadata, &body, &pdf_opts.into_options()?)
                .context("Composition failed")?;
            write_artifact(&artifact, output).await?;
            if !cli.quiet {
                eprintln!(
                    "✔ {} bytes → {}",
                    artifact.bytes.len(),
                    output.display()
                );
            }
        }

        Command::Serve { ref bind } => {
            assignforge::web::serve(bind, config)
                .await
                .with_context(|| format!("Web server failed on {bind}"))?;
        }
    }

    Ok(())
}

/// Map global CLI flags to a `GenerationConfig`.
fn build_config(cli: &Cli) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder().api_timeout_secs(cli.api_timeout);
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    builder.build().context("Invalid configuration")
}

/// Read and extract a PDF, with a status line unless quiet.
fn extract_with_feedback(pdf: &Path, quiet: bool) -> Result<String> {
    let bytes =
        std::fs::read(pdf).with_context(|| format!("Failed to read {}", pdf.display()))?;
    let text = extract_pdf_text(&bytes)
        .with_context(|| format!("Failed to extract text from {}", pdf.display()))?;
    if !quiet {
        eprintln!("Extracted {} characters from {}", text.len(), pdf.display());
    }
    Ok(text)
}

/// Pick the output format from the file extension.
fn format_from_path(path: &Path) -> Result<OutputFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match OutputFormat::parse(ext) {
        Some(f) => Ok(f),
        None => bail!(
            "Cannot infer output format from '{}': use a .pdf or .odt extension",
            path.display()
        ),
    }
}

/// Terminal spinner shown while an LLM call is in flight.
fn spinner(quiet: bool, message: &'static str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

fn finish_spinner(bar: Option<ProgressBar>) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}
