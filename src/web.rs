//! Web surface: a single-session upload/analyze/clarify/generate/download
//! form over axum.
//!
//! The UI is deliberately plain server-rendered HTML — one page whose
//! sections appear as the session advances through its phases. Every POST
//! performs exactly one pipeline action synchronously (the handler awaits
//! the LLM call before responding) and then re-renders the page, so the
//! browser state is always the session state.
//!
//! One session per process: the `Session` lives in a `tokio::sync::Mutex`
//! inside the shared state, and each handler holds the lock for the whole
//! action. That serialises user interactions by construction — there is no
//! multi-user concurrency to manage.

use crate::compose::{AssignmentMetadata, OutputFormat, PdfOptions};
use crate::config::GenerationConfig;
use crate::error::{ErrorKind, ForgeError};
use crate::generate;
use crate::session::{Phase, Session};
use axum::extract::{DefaultBodyLimit, Form, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Upload cap: course PDFs run a few MB; 25 MB leaves headroom without
/// letting a stray upload exhaust memory.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<GenerationConfig>,
    session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            config: Arc::new(config),
            session: Arc::new(Mutex::new(Session::new())),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_handler))
        .route("/clarify", post(clarify_handler))
        .route("/generate", post(generate_handler))
        .route("/download", post(download_handler))
        .route("/reset", post(reset_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(bind: &str, config: GenerationConfig) -> std::io::Result<()> {
    let state = AppState::new(config);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "assignforge web UI listening");
    axum::serve(listener, router(state)).await
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let phase = state.session.lock().await.phase();
    Json(serde_json::json!({ "status": "ok", "phase": phase }))
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let session = state.session.lock().await;
    Html(render_page(&session, None))
}

async fn reset_handler(State(state): State<AppState>) -> Redirect {
    state.session.lock().await.reset();
    Redirect::to("/")
}

/// Upload a PDF + instructions, extract its text, run the analysis pass.
async fn analyze_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut pdf_bytes: Vec<u8> = Vec::new();
    let mut instructions = String::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("document") => match field.bytes().await {
                Ok(b) => pdf_bytes = b.to_vec(),
                Err(e) => {
                    let session = state.session.lock().await;
                    return error_page(
                        &session,
                        StatusCode::BAD_REQUEST,
                        &format!("upload failed: {e}"),
                    );
                }
            },
            Some("instructions") => {
                instructions = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }

    let mut session = state.session.lock().await;
    if session.phase() != Phase::Idle {
        return phase_conflict(&session, "analyze");
    }
    if pdf_bytes.is_empty() {
        return error_page(&session, StatusCode::BAD_REQUEST, "no PDF file uploaded");
    }

    let document_text = match generate::extract_pdf_text(&pdf_bytes) {
        Ok(t) => t,
        Err(e) => return forge_error_page(&session, &e),
    };

    let analysis = match generate::run_analysis(&document_text, &instructions, &state.config).await
    {
        Ok(a) => a,
        Err(e) => return forge_error_page(&session, &e),
    };

    // The pipeline step succeeded; recording it cannot conflict because the
    // phase was checked under the same lock.
    if let Err(e) = session.record_analysis(document_text, instructions, analysis) {
        return error_page(&session, StatusCode::CONFLICT, &e.to_string());
    }
    info!("Session advanced to Analyzed");
    Html(render_page(&session, None)).into_response()
}

#[derive(Deserialize)]
struct ClarifyForm {
    #[serde(default)]
    clarifications: String,
}

/// Record clarifications (possibly empty) after reviewing the analysis.
async fn clarify_handler(
    State(state): State<AppState>,
    Form(form): Form<ClarifyForm>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.record_clarifications(form.clarifications) {
        Ok(()) => {
            info!("Session advanced to Clarified");
            Html(render_page(&session, None)).into_response()
        }
        Err(_) => phase_conflict(&session, "clarify"),
    }
}

/// Run the assignment-generation pass over the stored session inputs.
async fn generate_handler(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    if session.phase() != Phase::Clarified {
        return phase_conflict(&session, "generate");
    }

    let result = generate::run_assignment(
        &session.document_text,
        &session.instructions,
        &session.clarifications,
        &state.config,
    )
    .await;

    match result {
        Ok(assignment) => {
            if let Err(e) = session.record_assignment(assignment) {
                return error_page(&session, StatusCode::CONFLICT, &e.to_string());
            }
            info!("Session advanced to Generated");
            Html(render_page(&session, None)).into_response()
        }
        Err(e) => forge_error_page(&session, &e),
    }
}

/// Compose the generated assignment into a PDF or ODT and stream it back as
/// a download.
async fn download_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut format = None;
    let mut meta = AssignmentMetadata::default();
    let mut options = PdfOptions::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "logo" => {
                if let Ok(bytes) = field.bytes().await {
                    if !bytes.is_empty() {
                        options.logo = Some(bytes.to_vec());
                    }
                }
            }
            _ => {
                let value = field.text().await.unwrap_or_default();
                let trimmed = value.trim().to_string();
                let opt = (!trimmed.is_empty()).then_some(trimmed.clone());
                match name.as_str() {
                    "format" => format = OutputFormat::parse(&value),
                    "title" => meta.title = trimmed,
                    "name" => meta.name = opt,
                    "registration_number" => meta.registration_number = opt,
                    "instructor_name" => meta.instructor_name = opt,
                    "semester" => meta.semester = opt,
                    "university_name" => meta.university_name = opt,
                    "page_numbers" => options.include_page_numbers = value != "off",
                    _ => {}
                }
            }
        }
    }

    let session = state.session.lock().await;
    let assignment = match session.assignment_text() {
        Ok(t) => t,
        Err(_) => return phase_conflict(&session, "download"),
    };
    let Some(format) = format else {
        return error_page(
            &session,
            StatusCode::BAD_REQUEST,
            "format must be 'pdf' or 'odt'",
        );
    };

    match generate::compose_document(format, &meta, assignment, &options) {
        Ok(artifact) => {
            let filename = artifact.filename(meta.display_title());
            info!(%filename, bytes = artifact.bytes.len(), "Serving download");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, artifact.format.mime().to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                artifact.bytes,
            )
                .into_response()
        }
        Err(e) => forge_error_page(&session, &e),
    }
}

// ── Error responses ──────────────────────────────────────────────────────

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Generation => StatusCode::BAD_GATEWAY,
        ErrorKind::Composition => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Config => StatusCode::BAD_REQUEST,
    }
}

fn forge_error_page(session: &Session, error: &ForgeError) -> Response {
    tracing::warn!(kind = ?error.kind(), %error, "Pipeline action failed");
    let message = format!("{}: {}", error.kind().label(), error);
    error_page(session, status_for(error.kind()), &message)
}

fn phase_conflict(session: &Session, action: &str) -> Response {
    let message = format!(
        "'{action}' is not available right now (current step: {:?}); use Restart to begin again",
        session.phase()
    );
    error_page(session, StatusCode::CONFLICT, &message)
}

fn error_page(session: &Session, status: StatusCode, message: &str) -> Response {
    (status, Html(render_page(session, Some(message)))).into_response()
}

// ── Page rendering ───────────────────────────────────────────────────────

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_page(session: &Session, error: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(message) = error {
        body.push_str(&format!(
            "<p class=\"error\">{}</p>\n",
            escape_html(message)
        ));
    }

    match session.phase() {
        Phase::Idle => body.push_str(UPLOAD_FORM),
        Phase::Analyzed => {
            body.push_str(&analysis_section(&session.analysis));
            body.push_str(CLARIFY_FORM);
        }
        Phase::Clarified => {
            body.push_str(&analysis_section(&session.analysis));
            body.push_str(GENERATE_FORM);
        }
        Phase::Generated => {
            body.push_str(&format!(
                "<h2>Generated assignment</h2>\n<pre>{}</pre>\n",
                escape_html(&session.assignment)
            ));
            body.push_str(DOWNLOAD_FORM);
        }
    }

    if session.phase() != Phase::Idle {
        body.push_str(RESET_FORM);
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>assignforge</title>\n<style>{CSS}</style>\n</head>\n<body>\n\
         <h1>assignforge</h1>\n\
         <p class=\"tagline\">Upload a PDF, review the analysis, and download a formatted assignment.</p>\n\
         {body}</body>\n</html>\n"
    )
}

fn analysis_section(analysis: &str) -> String {
    format!(
        "<h2>Document analysis</h2>\n<pre>{}</pre>\n",
        escape_html(analysis)
    )
}

const CSS: &str = "body{font-family:Georgia,serif;max-width:52rem;margin:2rem auto;padding:0 1rem}\
pre{white-space:pre-wrap;background:#f6f6f2;padding:1rem;border:1px solid #ddd}\
.error{color:#8b0000;border:1px solid #8b0000;padding:0.6rem}\
label{display:block;margin-top:0.6rem}textarea,input[type=text]{width:100%}\
button{margin-top:0.8rem;padding:0.4rem 1.2rem}.tagline{color:#555}";

const UPLOAD_FORM: &str = r#"<h2>1. Upload</h2>
<form action="/analyze" method="post" enctype="multipart/form-data">
<label>PDF document <input type="file" name="document" accept="application/pdf" required></label>
<label>Assignment questions or instructions (optional)
<textarea name="instructions" rows="5"></textarea></label>
<button type="submit">Analyse document</button>
</form>
"#;

const CLARIFY_FORM: &str = r#"<h2>2. Clarifications</h2>
<p>Resolve any ambiguities listed above, or leave blank if none are needed.</p>
<form action="/clarify" method="post">
<label>Clarifications (optional)
<textarea name="clarifications" rows="4"></textarea></label>
<button type="submit">Continue</button>
</form>
"#;

const GENERATE_FORM: &str = r#"<h2>3. Generate</h2>
<form action="/generate" method="post">
<button type="submit">Generate assignment</button>
</form>
"#;

const DOWNLOAD_FORM: &str = r#"<h2>4. Download</h2>
<form action="/download" method="post" enctype="multipart/form-data">
<label>Format
<select name="format">
<option value="pdf">PDF</option>
<option value="odt">ODT</option>
</select></label>
<label>Assignment title <input type="text" name="title" value="Assignment"></label>
<label>Student name <input type="text" name="name"></label>
<label>Registration number <input type="text" name="registration_number"></label>
<label>Instructor <input type="text" name="instructor_name"></label>
<label>Semester <input type="text" name="semester"></label>
<label>University <input type="text" name="university_name"></label>
<label>Logo for the PDF cover (optional) <input type="file" name="logo" accept="image/png,image/jpeg"></label>
<input type="hidden" name="page_numbers" value="off">
<label><input type="checkbox" name="page_numbers" value="on" checked> Page numbers on PDF content pages</label>
<button type="submit">Download</button>
</form>
"#;

const RESET_FORM: &str = r#"<form action="/reset" method="post">
<button type="submit">Restart</button>
</form>
"#;
