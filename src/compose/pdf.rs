//! PDF composition: metadata + blocks → a fixed-layout A4 byte stream.
//!
//! Built directly on `printpdf` with the built-in Times faces, so no font
//! files ship with the crate. Built-in fonts expose no glyph metrics, so
//! horizontal measurement (centring, wrapping) uses the usual average-width
//! approximation of half an em per character — accurate enough for body
//! text and titles.
//!
//! Layout: a cover page (optional logo, centred title, left-aligned field
//! rows), then the body blocks paginated top-to-bottom with a fresh page
//! whenever the cursor would cross the bottom margin. Body paragraphs are
//! left-aligned wrapped text; list items are indented with a literal
//! bullet/number label.

use super::{AssignmentMetadata, PdfOptions};
use crate::error::ForgeError;
use crate::pipeline::markup::{clamp_level, Block};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rgb,
};
use tracing::{info, warn};

// A4 portrait, generous academic margins.
const PAGE_W: f64 = 210.0;
const PAGE_H: f64 = 297.0;
const MARGIN: f64 = 25.0;
const USABLE_W: f64 = PAGE_W - 2.0 * MARGIN;

/// Points → millimetres.
const PT_TO_MM: f64 = 0.352_78;

/// Average glyph advance as a fraction of the font size.
const AVG_CHAR_EM: f64 = 0.5;

fn pdf_err(detail: impl std::fmt::Display) -> ForgeError {
    ForgeError::PdfCompose {
        detail: detail.to_string(),
    }
}

/// Estimated rendered width of `text` at `size_pt`, in millimetres.
fn estimate_width_mm(text: &str, size_pt: f64) -> f64 {
    text.chars().count() as f64 * size_pt * AVG_CHAR_EM * PT_TO_MM
}

/// Greedy word wrap to a character budget. Never splits words; a single
/// overlong word gets its own line.
fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Character budget for one line at `size_pt` with `indent` millimetres
/// taken off the usable width.
fn max_chars_for(size_pt: f64, indent: f64) -> usize {
    let char_w = size_pt * AVG_CHAR_EM * PT_TO_MM;
    (((USABLE_W - indent) / char_w).floor()).max(1.0) as usize
}

/// Cursor over the document being written: current layer, vertical
/// position, and page numbering state.
struct Composer {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    y: f64,
    page_num: usize,
    include_page_numbers: bool,
}

impl Composer {
    fn new(meta: &AssignmentMetadata, options: &PdfOptions) -> Result<Self, ForgeError> {
        let (doc, page, layer) =
            PdfDocument::new(meta.display_title(), Mm(PAGE_W as f32), Mm(PAGE_H as f32), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::TimesRoman)
            .map_err(pdf_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::TimesBold)
            .map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            regular,
            bold,
            layer,
            y: PAGE_H - MARGIN,
            page_num: 0,
            include_page_numbers: options.include_page_numbers,
        })
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    /// Draw one line at the current cursor, then advance by the line height.
    fn line(&mut self, text: &str, size_pt: f64, bold: bool, x: f64, gap: f64) {
        let line_h = size_pt * PT_TO_MM * 1.3;
        self.y -= line_h;
        if !text.is_empty() {
            self.layer
                .use_text(text, size_pt as f32, Mm(x as f32), Mm(self.y as f32), self.font(bold));
        }
        self.y -= gap;
    }

    /// Draw one horizontally-centred line.
    fn centered_line(&mut self, text: &str, size_pt: f64, bold: bool, gap: f64) {
        let width = estimate_width_mm(text, size_pt);
        let x = ((PAGE_W - width) / 2.0).max(MARGIN);
        self.line(text, size_pt, bold, x, gap);
    }

    /// Start a fresh content page (with its page number) and reset the cursor.
    fn new_content_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W as f32), Mm(PAGE_H as f32), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN;
        self.page_num += 1;

        if self.include_page_numbers {
            let label = format!("Page {}", self.page_num);
            let width = estimate_width_mm(&label, 10.0);
            self.layer
                .set_fill_color(Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
            self.layer.use_text(
                label,
                10.0,
                Mm(((PAGE_W - width) / 2.0) as f32),
                Mm(12.0),
                &self.regular,
            );
            self.layer
                .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        }
    }

    /// Break to a new page when fewer than `needed_mm` remain above the
    /// bottom margin.
    fn ensure_space(&mut self, needed_mm: f64) {
        if self.y - needed_mm < MARGIN {
            self.new_content_page();
        }
    }

    /// Optional cover logo, centred above the title. A logo that fails to
    /// decode is skipped — the cover is still valid without it.
    fn cover_logo(&mut self, logo: &[u8]) {
        let dynamic = match printpdf::image_crate::load_from_memory(logo) {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, "Skipping cover logo: image failed to decode");
                return;
            }
        };
        let image = Image::from_dynamic_image(&dynamic);

        let dpi = 300.0_f64;
        let px_to_mm = 25.4 / dpi;
        let natural_w = image.image.width.0 as f64 * px_to_mm;
        let natural_h = image.image.height.0 as f64 * px_to_mm;
        if natural_w <= 0.0 || natural_h <= 0.0 {
            return;
        }

        // Fit inside a 50×35mm box, preserving aspect ratio.
        let scale = (50.0 / natural_w).min(35.0 / natural_h).min(1.0);
        let w = natural_w * scale;
        let h = natural_h * scale;

        self.y -= h;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(((PAGE_W - w) / 2.0) as f32)),
                translate_y: Some(Mm(self.y as f32)),
                scale_x: Some(scale as f32),
                scale_y: Some(scale as f32),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
        self.y -= 10.0;
    }

    /// Render the cover page onto the current (first) page.
    fn cover(&mut self, meta: &AssignmentMetadata, options: &PdfOptions) {
        self.y = PAGE_H - 45.0;

        if let Some(ref logo) = options.logo {
            self.cover_logo(logo);
        }

        for title_line in wrap_words(meta.display_title(), max_chars_for(24.0, 0.0)) {
            self.centered_line(&title_line, 24.0, true, 2.0);
        }
        if let Some(university) = meta.university_name.as_deref() {
            if !university.trim().is_empty() {
                self.y -= 4.0;
                self.centered_line(university.trim(), 14.0, false, 0.0);
            }
        }

        self.y -= 25.0;
        for (label, value) in meta.cover_rows() {
            let label_text = format!("{label}: ");
            let label_w = estimate_width_mm(&label_text, 12.0);
            let line_h = 12.0 * PT_TO_MM * 1.3;
            self.y -= line_h;
            self.layer
                .use_text(&label_text, 12.0, Mm(MARGIN as f32), Mm(self.y as f32), &self.bold);
            self.layer.use_text(
                value,
                12.0,
                Mm((MARGIN + label_w) as f32),
                Mm(self.y as f32),
                &self.regular,
            );
            self.y -= 3.0;
        }
    }

    /// Render one body block, wrapping and paginating as needed.
    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, text } => {
                let (size, space_before) = match clamp_level(*level) {
                    1 => (18.0, 8.0),
                    2 => (16.0, 6.0),
                    _ => (14.0, 5.0),
                };
                // Keep the heading together with at least one body line.
                self.ensure_space(space_before + size * PT_TO_MM * 1.3 * 2.0);
                self.y -= space_before;
                for line in wrap_words(text, max_chars_for(size, 0.0)) {
                    self.ensure_space(size * PT_TO_MM * 1.3);
                    self.line(&line, size, true, MARGIN, 0.0);
                }
                self.y -= 2.0;
            }
            Block::Paragraph(text) => {
                for line in wrap_words(text, max_chars_for(12.0, 0.0)) {
                    self.ensure_space(12.0 * PT_TO_MM * 1.3);
                    self.line(&line, 12.0, false, MARGIN, 0.0);
                }
                self.y -= 3.0;
            }
            Block::Bullet(text) => self.list_item(&format!("• {text}")),
            Block::Numbered { number, text } => self.list_item(&format!("{number}. {text}")),
        }
    }

    fn list_item(&mut self, labelled: &str) {
        let indent = 6.0;
        for (i, line) in wrap_words(labelled, max_chars_for(12.0, indent))
            .into_iter()
            .enumerate()
        {
            self.ensure_space(12.0 * PT_TO_MM * 1.3);
            // Continuation lines hang under the item text.
            let x = if i == 0 {
                MARGIN + indent
            } else {
                MARGIN + indent + 4.0
            };
            self.line(&line, 12.0, false, x, 0.0);
        }
        self.y -= 1.5;
    }

    fn finish(self) -> Result<Vec<u8>, ForgeError> {
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}

/// Compose a complete PDF document.
///
/// The returned bytes start with the `%PDF` signature and contain the cover
/// page followed by the body blocks in source order.
pub fn compose(
    meta: &AssignmentMetadata,
    blocks: &[Block],
    options: &PdfOptions,
) -> Result<Vec<u8>, ForgeError> {
    let mut composer = Composer::new(meta, options)?;
    composer.cover(meta, options);

    // Body always starts on a fresh page after the cover.
    composer.new_content_page();
    for block in blocks {
        composer.block(block);
    }

    let bytes = composer.finish()?;
    info!(
        bytes = bytes.len(),
        blocks = blocks.len(),
        "Composed PDF document"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> AssignmentMetadata {
        AssignmentMetadata {
            title: "Wrap Test".into(),
            name: Some("Jane Doe".into()),
            ..Default::default()
        }
    }

    #[test]
    fn wrap_respects_budget_and_keeps_words_whole() {
        let lines = wrap_words("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        for line in &lines {
            assert!(line.chars().count() <= 11);
        }
    }

    #[test]
    fn wrap_overlong_word_gets_own_line() {
        let lines = wrap_words("hi supercalifragilistic", 10);
        assert_eq!(lines, vec!["hi", "supercalifragilistic"]);
    }

    #[test]
    fn wrap_empty_text_yields_one_blank_line() {
        assert_eq!(wrap_words("   ", 20), vec![String::new()]);
    }

    #[test]
    fn char_budget_shrinks_with_size_and_indent() {
        assert!(max_chars_for(18.0, 0.0) < max_chars_for(12.0, 0.0));
        assert!(max_chars_for(12.0, 10.0) < max_chars_for(12.0, 0.0));
        assert!(max_chars_for(200.0, 0.0) >= 1);
    }

    #[test]
    fn output_starts_with_pdf_signature() {
        let blocks = vec![
            Block::heading(1, "Introduction"),
            Block::Paragraph("Body text.".into()),
        ];
        let bytes = compose(&sample_meta(), &blocks, &PdfOptions::default()).unwrap();
        assert!(bytes.len() > 500);
        assert_eq!(&bytes[..4], b"%PDF");
    }

    #[test]
    fn long_body_paginates_without_error() {
        let para = "A sentence that is long enough to wrap a few times when rendered. ".repeat(8);
        let blocks: Vec<Block> = (0..60).map(|_| Block::Paragraph(para.clone())).collect();
        let bytes = compose(&sample_meta(), &blocks, &PdfOptions::default()).unwrap();
        assert_eq!(&bytes[..4], b"%PDF");
    }

    #[test]
    fn invalid_logo_is_skipped_not_fatal() {
        let options = PdfOptions {
            logo: Some(vec![0xde, 0xad, 0xbe, 0xef]),
            include_page_numbers: true,
        };
        let bytes = compose(&sample_meta(), &[Block::Paragraph("x".into())], &options).unwrap();
        assert_eq!(&bytes[..4], b"%PDF");
    }
}
