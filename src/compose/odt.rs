//! ODT composition: metadata + blocks → an OpenDocument Text byte stream.
//!
//! An ODT file is a zip archive with a strict shape: the `mimetype` entry
//! must come first and must be stored uncompressed so document sniffers can
//! read the type from a fixed offset. The remaining entries
//! (`META-INF/manifest.xml`, `meta.xml`, `styles.xml`, `content.xml`) are
//! deflated normally.
//!
//! The XML is assembled by hand rather than through an XML library: the
//! document shape is fixed, only text nodes vary, and everything user-
//! supplied passes through [`escape_xml`].

use super::AssignmentMetadata;
use crate::error::ForgeError;
use crate::pipeline::markup::Block;
use std::io::Write;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

const MANIFEST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.3">
  <manifest:file-entry manifest:full-path="/" manifest:version="1.3" manifest:media-type="application/vnd.oasis.opendocument.text"/>
  <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
  <manifest:file-entry manifest:full-path="styles.xml" manifest:media-type="text/xml"/>
  <manifest:file-entry manifest:full-path="meta.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;

/// Shared document styles: Times New Roman body, justified paragraphs,
/// bold headings at 18/14/12pt, centred Title/Subtitle for the cover, and
/// bullet (`L1`) / numbered (`L2`) list styles.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-styles xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" office:version="1.3">
  <office:styles>
    <style:default-style style:family="paragraph">
      <style:paragraph-properties fo:text-align="justify" style:justify-single-word="false"/>
      <style:text-properties style:font-name="Times New Roman" fo:font-size="12pt" fo:language="en" fo:country="US"/>
    </style:default-style>
    <style:style style:name="Standard" style:family="paragraph" style:class="text">
      <style:paragraph-properties fo:margin-top="0in" fo:margin-bottom="0.0835in" fo:text-align="justify" style:justify-single-word="false"/>
    </style:style>
    <style:style style:name="Heading_20_1" style:display-name="Heading 1" style:family="paragraph" style:parent-style-name="Heading" style:next-style-name="Text_20_body" style:class="text">
      <style:paragraph-properties fo:margin-top="0.1665in" fo:margin-bottom="0.0835in" fo:keep-with-next="conditional"/>
      <style:text-properties fo:font-size="18pt" fo:font-weight="bold"/>
    </style:style>
    <style:style style:name="Heading_20_2" style:display-name="Heading 2" style:family="paragraph" style:parent-style-name="Heading" style:next-style-name="Text_20_body" style:class="text">
      <style:paragraph-properties fo:margin-top="0.1251in" fo:margin-bottom="0.0835in" fo:keep-with-next="conditional"/>
      <style:text-properties fo:font-size="14pt" fo:font-weight="bold"/>
    </style:style>
    <style:style style:name="Heading_20_3" style:display-name="Heading 3" style:family="paragraph" style:parent-style-name="Heading" style:next-style-name="Text_20_body" style:class="text">
      <style:paragraph-properties fo:margin-top="0.0835in" fo:margin-bottom="0.0835in" fo:keep-with-next="conditional"/>
      <style:text-properties fo:font-size="12pt" fo:font-weight="bold"/>
    </style:style>
    <style:style style:name="Title" style:family="paragraph" style:parent-style-name="Heading" style:class="chapter">
      <style:paragraph-properties fo:text-align="center" style:justify-single-word="false"/>
      <style:text-properties fo:font-size="24pt" fo:font-weight="bold"/>
    </style:style>
    <style:style style:name="Subtitle" style:family="paragraph" style:parent-style-name="Heading" style:class="chapter">
      <style:paragraph-properties fo:text-align="center" style:justify-single-word="false" fo:margin-top="0.0417in" fo:margin-bottom="0.0835in"/>
      <style:text-properties fo:font-size="14pt" fo:font-style="italic"/>
    </style:style>
    <text:list-style style:name="L1">
      <text:list-level-style-bullet text:level="1" text:style-name="Bullet_20_Symbols" text:bullet-char="•">
        <style:list-level-properties text:list-level-position-and-space-mode="label-alignment">
          <style:list-level-label-alignment text:label-followed-by="listtab" text:list-tab-stop-position="0.5in" fo:text-indent="-0.25in" fo:margin-left="0.5in"/>
        </style:list-level-properties>
      </text:list-level-style-bullet>
    </text:list-style>
    <text:list-style style:name="L2">
      <text:list-level-style-number text:level="1" text:style-name="Numbering_20_Symbols" style:num-suffix="." style:num-format="1">
        <style:list-level-properties text:list-level-position-and-space-mode="label-alignment">
          <style:list-level-label-alignment text:label-followed-by="listtab" text:list-tab-stop-position="0.5in" fo:text-indent="-0.25in" fo:margin-left="0.5in"/>
        </style:list-level-properties>
      </text:list-level-style-number>
    </text:list-style>
  </office:styles>
</office:document-styles>"#;

/// Escape the five XML special characters in user-supplied text.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn meta_xml(meta: &AssignmentMetadata) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let title = escape_xml(meta.display_title());
    let creator = escape_xml(meta.name.as_deref().unwrap_or(""));
    let university = escape_xml(meta.university_name.as_deref().unwrap_or(""));
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-meta xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0" xmlns:dc="http://purl.org/dc/elements/1.1/" office:version="1.3">
  <office:meta>
    <meta:generator>assignforge/{version}</meta:generator>
    <dc:title>{title}</dc:title>
    <dc:creator>{creator}</dc:creator>
    <dc:subject>{title} - {university}</dc:subject>
    <meta:creation-date>{now}</meta:creation-date>
    <dc:date>{now}</dc:date>
    <dc:language>en-US</dc:language>
  </office:meta>
</office:document-meta>"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Render the cover page paragraphs: centred title, optional university
/// subtitle, then the left-aligned labelled field rows.
fn cover_fragment(meta: &AssignmentMetadata) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<text:p text:style-name=\"Title\">{}</text:p>\n",
        escape_xml(meta.display_title())
    ));
    out.push_str("<text:p text:style-name=\"P1\"/>\n");
    if let Some(university) = meta.university_name.as_deref() {
        if !university.trim().is_empty() {
            out.push_str(&format!(
                "<text:p text:style-name=\"Subtitle\">{}</text:p>\n",
                escape_xml(university.trim())
            ));
        }
    }
    out.push_str("<text:p text:style-name=\"P1\"/>\n<text:p text:style-name=\"P1\"/>\n");
    for (label, value) in meta.cover_rows() {
        out.push_str(&format!(
            "<text:p text:style-name=\"P4\"><text:span text:style-name=\"FieldLabel\">{label}:</text:span> {value}</text:p>\n",
            label = escape_xml(label),
            value = escape_xml(value),
        ));
    }
    out
}

/// Render the body blocks, grouping consecutive list items of the same kind
/// into a single `text:list` so list numbering continues correctly.
fn body_fragment(blocks: &[Block]) -> String {
    #[derive(PartialEq)]
    enum ListKind {
        None,
        Bullet,
        Numbered,
    }

    let mut out = String::new();
    let mut open = ListKind::None;

    let close_list = |out: &mut String, open: &mut ListKind| {
        if *open != ListKind::None {
            out.push_str("</text:list>\n");
            *open = ListKind::None;
        }
    };

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                close_list(&mut out, &mut open);
                let level = crate::pipeline::markup::clamp_level(*level);
                out.push_str(&format!(
                    "<text:h text:style-name=\"Heading_20_{level}\" text:outline-level=\"{level}\">{}</text:h>\n",
                    escape_xml(text)
                ));
            }
            Block::Paragraph(text) => {
                close_list(&mut out, &mut open);
                out.push_str(&format!(
                    "<text:p text:style-name=\"P1\">{}</text:p>\n",
                    escape_xml(text)
                ));
            }
            Block::Bullet(text) => {
                if open != ListKind::Bullet {
                    close_list(&mut out, &mut open);
                    out.push_str("<text:list text:style-name=\"L1\">\n");
                    open = ListKind::Bullet;
                }
                out.push_str(&format!(
                    "<text:list-item><text:p text:style-name=\"P2\">{}</text:p></text:list-item>\n",
                    escape_xml(text)
                ));
            }
            Block::Numbered { text, .. } => {
                if open != ListKind::Numbered {
                    close_list(&mut out, &mut open);
                    out.push_str("<text:list text:style-name=\"L2\">\n");
                    open = ListKind::Numbered;
                }
                out.push_str(&format!(
                    "<text:list-item><text:p text:style-name=\"P2\">{}</text:p></text:list-item>\n",
                    escape_xml(text)
                ));
            }
        }
    }
    close_list(&mut out, &mut open);
    out
}

fn content_xml(meta: &AssignmentMetadata, blocks: &[Block]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" office:version="1.3">
  <office:automatic-styles>
    <style:style style:name="P1" style:family="paragraph" style:parent-style-name="Standard">
      <style:paragraph-properties fo:text-align="justify" style:justify-single-word="false"/>
    </style:style>
    <style:style style:name="P2" style:family="paragraph" style:parent-style-name="Standard">
      <style:paragraph-properties fo:margin-left="0.5in" fo:text-indent="-0.25in"/>
    </style:style>
    <style:style style:name="P3" style:family="paragraph" style:parent-style-name="Standard">
      <style:paragraph-properties fo:text-align="center" style:justify-single-word="false"/>
    </style:style>
    <style:style style:name="P4" style:family="paragraph" style:parent-style-name="Standard">
      <style:paragraph-properties fo:text-align="start"/>
    </style:style>
    <style:style style:name="P5" style:family="paragraph" style:parent-style-name="Standard">
      <style:paragraph-properties fo:break-before="page"/>
    </style:style>
    <style:style style:name="FieldLabel" style:family="text">
      <style:text-properties fo:font-weight="bold"/>
    </style:style>
  </office:automatic-styles>
  <office:body>
    <office:text>
{cover}<text:p text:style-name="P5"/>
{body}    </office:text>
  </office:body>
</office:document-content>"#,
        cover = cover_fragment(meta),
        body = body_fragment(blocks),
    )
}

/// Compose a complete ODT document.
///
/// The returned bytes are a valid zip archive starting with the `PK`
/// signature and openable by LibreOffice Writer, Microsoft Word, and Google
/// Docs.
pub fn compose(meta: &AssignmentMetadata, blocks: &[Block]) -> Result<Vec<u8>, ForgeError> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be the first entry and uncompressed.
    add_entry(&mut writer, "mimetype", MIMETYPE.as_bytes(), stored)?;
    add_entry(
        &mut writer,
        "META-INF/manifest.xml",
        MANIFEST_XML.as_bytes(),
        deflated,
    )?;
    add_entry(&mut writer, "meta.xml", meta_xml(meta).as_bytes(), deflated)?;
    add_entry(&mut writer, "styles.xml", STYLES_XML.as_bytes(), deflated)?;
    add_entry(
        &mut writer,
        "content.xml",
        content_xml(meta, blocks).as_bytes(),
        deflated,
    )?;

    let cursor = writer.finish().map_err(|e| ForgeError::OdtCompose {
        detail: e.to_string(),
    })?;
    let bytes = cursor.into_inner();

    info!(
        bytes = bytes.len(),
        blocks = blocks.len(),
        "Composed ODT document"
    );
    Ok(bytes)
}

fn add_entry(
    writer: &mut ZipWriter<std::io::Cursor<Vec<u8>>>,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> Result<(), ForgeError> {
    writer
        .start_file(name, options)
        .map_err(|e| ForgeError::OdtCompose {
            detail: format!("{name}: {e}"),
        })?;
    writer.write_all(data).map_err(|e| ForgeError::OdtCompose {
        detail: format!("{name}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> AssignmentMetadata {
        AssignmentMetadata {
            title: "Sample Essay".into(),
            name: Some("Jane Doe".into()),
            registration_number: Some("REG-1".into()),
            instructor_name: None,
            semester: Some("Fall 2024".into()),
            university_name: Some("Test University".into()),
        }
    }

    #[test]
    fn escape_xml_covers_all_specials() {
        assert_eq!(
            escape_xml(r#"a & b < c > "d" 'e'"#),
            "a &amp; b &lt; c &gt; &quot;d&quot; &apos;e&apos;"
        );
    }

    #[test]
    fn output_is_a_zip_with_stored_mimetype_first() {
        let bytes = compose(&sample_meta(), &[Block::Paragraph("Hello".into())]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        // Stored mimetype entry: the literal type string sits at a fixed
        // offset right after the 30-byte local header + 8-byte name.
        let head = String::from_utf8_lossy(&bytes[..128]);
        assert!(head.contains("mimetype"));
        assert!(head.contains(MIMETYPE));
    }

    #[test]
    fn cover_contains_title_and_fields() {
        let xml = content_xml(&sample_meta(), &[]);
        assert!(xml.contains("Sample Essay"));
        assert!(xml.contains("Jane Doe"));
        assert!(xml.contains("Fall 2024"));
        assert!(xml.contains("Test University"));
        // Instructor was unset — no empty row rendered.
        assert!(!xml.contains("Instructor:"));
    }

    #[test]
    fn heading_levels_are_clamped_in_output() {
        let blocks = vec![Block::Heading {
            level: 5,
            text: "Deep".into(),
        }];
        let xml = content_xml(&sample_meta(), &blocks);
        assert!(xml.contains("Heading_20_3"));
        assert!(xml.contains("text:outline-level=\"3\""));
        assert!(!xml.contains("Heading_20_5"));
    }

    #[test]
    fn consecutive_list_items_share_one_list() {
        let blocks = vec![
            Block::Bullet("one".into()),
            Block::Bullet("two".into()),
            Block::Numbered {
                number: 1,
                text: "step".into(),
            },
        ];
        let xml = body_fragment(&blocks);
        assert_eq!(xml.matches("<text:list ").count(), 2, "got: {xml}");
        assert_eq!(xml.matches("</text:list>").count(), 2);
        assert!(xml.contains("L1"));
        assert!(xml.contains("L2"));
    }

    #[test]
    fn body_preserves_block_order() {
        let blocks = vec![
            Block::heading(1, "Intro"),
            Block::Paragraph("First.".into()),
            Block::Bullet("point".into()),
            Block::heading(2, "Next"),
        ];
        let xml = body_fragment(&blocks);
        let intro = xml.find("Intro").unwrap();
        let first = xml.find("First.").unwrap();
        let point = xml.find("point").unwrap();
        let next = xml.find("Next").unwrap();
        assert!(intro < first && first < point && point < next);
    }

    #[test]
    fn user_text_is_escaped_in_content() {
        let blocks = vec![Block::Paragraph("AT&T <rocks>".into())];
        let xml = content_xml(&sample_meta(), &blocks);
        assert!(xml.contains("AT&amp;T &lt;rocks&gt;"));
    }
}
