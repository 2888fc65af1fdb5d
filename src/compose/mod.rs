//! Document composition: metadata + body blocks → a finished byte stream.
//!
//! Two renderers share one input shape ([`AssignmentMetadata`] plus a slice
//! of [`Block`]s) and one output shape (a complete, openable byte stream):
//!
//! * [`pdf`] — fixed-layout A4 output via `printpdf`. Supports an optional
//!   cover logo and page numbering.
//! * [`odt`] — editable OpenDocument Text via the `zip` crate. No logo or
//!   page-number support; this is a known limitation of the ODT path, not a
//!   defect.
//!
//! Both walk the block slice front to back and never reorder: heading levels
//! map to heading styles, paragraphs to body text, list items to
//! bulleted/numbered list entries. Composition either completes or fails
//! with a composition error — there is no partial output.

pub mod odt;
pub mod pdf;

use serde::{Deserialize, Serialize};

/// Cover-page metadata for a generated assignment.
///
/// Every field except `title` is optional; empty fields are simply omitted
/// from the cover page. The struct is taken by reference everywhere —
/// composers never mutate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentMetadata {
    /// Assignment title; falls back to "Assignment" when blank.
    pub title: String,
    /// Student's full name.
    pub name: Option<String>,
    /// Student registration or ID number.
    pub registration_number: Option<String>,
    /// Course instructor's name.
    pub instructor_name: Option<String>,
    /// Semester or term.
    pub semester: Option<String>,
    /// University or institution name.
    pub university_name: Option<String>,
}

impl AssignmentMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Title with the blank fallback applied.
    pub fn display_title(&self) -> &str {
        let t = self.title.trim();
        if t.is_empty() {
            "Assignment"
        } else {
            t
        }
    }

    /// Labelled cover rows, skipping unset or blank fields.
    pub(crate) fn cover_rows(&self) -> Vec<(&'static str, &str)> {
        [
            ("Student Name", &self.name),
            ("Registration Number", &self.registration_number),
            ("Instructor", &self.instructor_name),
            ("Semester", &self.semester),
            ("University", &self.university_name),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            let v = value.as_deref()?.trim();
            if v.is_empty() {
                None
            } else {
                Some((label, v))
            }
        })
        .collect()
    }
}

/// Output container format of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Odt,
}

impl OutputFormat {
    /// MIME type for the download response.
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Odt => "application/vnd.oasis.opendocument.text",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Odt => "odt",
        }
    }

    /// Parse a user-supplied format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(OutputFormat::Pdf),
            "odt" => Some(OutputFormat::Odt),
            _ => None,
        }
    }
}

/// A finished document: opaque bytes plus their container format.
///
/// Created once per generation request and never mutated; the presentation
/// layer holds it only for the duration of the download response.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

impl Artifact {
    /// Download filename derived from the assignment title.
    pub fn filename(&self, title: &str) -> String {
        let stem: String = title
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let stem = stem.trim_matches('_');
        let stem = if stem.is_empty() { "assignment" } else { stem };
        format!("{}.{}", stem.to_ascii_lowercase(), self.format.extension())
    }
}

/// Knobs for the PDF renderer; the ODT path has none.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Raw PNG/JPEG bytes for a cover logo. Undecodable images are skipped
    /// with a warning rather than failing the whole document.
    pub logo: Option<Vec<u8>>,
    /// Render "Page N" centred at the bottom of each content page.
    pub include_page_numbers: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            logo: None,
            include_page_numbers: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_rows_skip_blank_fields() {
        let meta = AssignmentMetadata {
            title: "T".into(),
            name: Some("Jane Doe".into()),
            registration_number: Some("   ".into()),
            instructor_name: None,
            semester: Some("Fall 2024".into()),
            university_name: None,
        };
        let rows = meta.cover_rows();
        assert_eq!(
            rows,
            vec![("Student Name", "Jane Doe"), ("Semester", "Fall 2024")]
        );
    }

    #[test]
    fn blank_title_falls_back() {
        assert_eq!(AssignmentMetadata::new("  ").display_title(), "Assignment");
        assert_eq!(AssignmentMetadata::new("Essay").display_title(), "Essay");
    }

    #[test]
    fn format_parse_and_mime() {
        assert_eq!(OutputFormat::parse("PDF"), Some(OutputFormat::Pdf));
        assert_eq!(OutputFormat::parse(" odt "), Some(OutputFormat::Odt));
        assert_eq!(OutputFormat::parse("docx"), None);
        assert_eq!(OutputFormat::Pdf.mime(), "application/pdf");
        assert_eq!(
            OutputFormat::Odt.mime(),
            "application/vnd.oasis.opendocument.text"
        );
    }

    #[test]
    fn artifact_filename_is_sanitised() {
        let a = Artifact {
            bytes: vec![1],
            format: OutputFormat::Odt,
        };
        assert_eq!(a.filename("Final Essay: Draft #2"), "final_essay__draft__2.odt");
        assert_eq!(a.filename("   "), "assignment.odt");
    }
}
