//! Markup parsing: LLM-generated text → ordered document blocks.
//!
//! ## Why clean before parsing?
//!
//! Even well-prompted models occasionally introduce artefacts that are
//! semantically fine but structurally wrong for a document renderer:
//! wrapping the whole answer in ` ```markdown ``` ` fences despite being told
//! not to, Windows line endings, runs of blank lines, or invisible Unicode
//! (zero-width spaces, soft hyphens) that would end up verbatim in the
//! rendered document. [`clean_generated_text`] applies cheap deterministic
//! rules in a fixed order; each rule is a pure `&str → String` function and
//! independently testable.
//!
//! ## Block grammar
//!
//! The cleaned text is parsed line-by-line into [`Block`]s:
//!
//! * `#`, `##`, `###`, … — headings; the level is clamped to 1..=3
//! * `- `, `* `, `+ `    — bullet list items
//! * `1. ` / `1) `       — numbered list items (the number is preserved)
//! * anything else       — paragraph text; consecutive lines merge into one
//!   paragraph, blank lines separate paragraphs
//!
//! Source order is preserved exactly — the composers walk the returned
//! vector front to back and never reorder.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Highest heading level the composers style; deeper levels clamp to this.
pub const MAX_HEADING_LEVEL: u8 = 3;

/// One semantic block of the generated document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    /// Styled heading, `level` ∈ 1..=3.
    Heading { level: u8, text: String },
    /// Plain body paragraph.
    Paragraph(String),
    /// Bulleted list item.
    Bullet(String),
    /// Numbered list item; `number` is the label from the source text.
    Numbered { number: usize, text: String },
}

impl Block {
    /// Convenience constructor that applies the heading clamp.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level: clamp_level(level),
            text: text.into(),
        }
    }

    /// The block's visible text, without structural markers.
    pub fn text(&self) -> &str {
        match self {
            Block::Heading { text, .. } => text,
            Block::Paragraph(text) => text,
            Block::Bullet(text) => text,
            Block::Numbered { text, .. } => text,
        }
    }
}

/// Clamp a heading level into the styled range 1..=3.
pub fn clamp_level(level: u8) -> u8 {
    level.clamp(1, MAX_HEADING_LEVEL)
}

// ── Cleanup rules ────────────────────────────────────────────────────────

/// Apply all cleanup rules to raw model output, in order.
///
/// 1. Normalise line endings (CRLF → LF) — must run first so the fence
///    pattern sees plain `\n`
/// 2. Strip outer markdown fences (models sometimes disobey the prompt)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
pub fn clean_generated_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fences(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    remove_invisible_chars(&s)
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

/// Strip inline emphasis markers the composers do not render.
///
/// Bold/italic asterisks and inline backticks would otherwise appear
/// literally in the finished document. Lone asterisks inside words are left
/// alone.
fn strip_inline_markup(text: &str) -> String {
    text.replace("**", "").replace("__", "").replace('`', "")
}

// ── Block parsing ────────────────────────────────────────────────────────

static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)[.)]\s+(.*)$").unwrap());

/// Parse cleaned text into ordered blocks.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            let joined = paragraph.join(" ");
            blocks.push(Block::Paragraph(strip_inline_markup(&joined)));
            paragraph.clear();
        }
    }

    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim_end();
        let stripped = line.trim_start();

        if stripped.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }

        // Headings: count leading '#', text follows.
        if let Some(rest) = stripped.strip_prefix('#') {
            flush_paragraph(&mut paragraph, &mut blocks);
            let extra = rest.chars().take_while(|&c| c == '#').count();
            let level = (1 + extra).min(u8::MAX as usize) as u8;
            let heading_text = rest[extra..].trim();
            if heading_text.is_empty() {
                continue;
            }
            blocks.push(Block::heading(level, strip_inline_markup(heading_text)));
            continue;
        }

        // Bulleted list items.
        if let Some(item) = stripped
            .strip_prefix("- ")
            .or_else(|| stripped.strip_prefix("* "))
            .or_else(|| stripped.strip_prefix("+ "))
        {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Bullet(strip_inline_markup(item.trim())));
            continue;
        }

        // Numbered list items.
        if let Some(caps) = RE_NUMBERED.captures(stripped) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let number: usize = caps[1].parse().unwrap_or(1);
            blocks.push(Block::Numbered {
                number,
                text: strip_inline_markup(caps[2].trim()),
            });
            continue;
        }

        // Plain paragraph text; merged with adjacent plain lines.
        paragraph.push(stripped);
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

/// Clean and parse in one step — the shape the composers consume.
pub fn blocks_from_generated(raw: &str) -> Vec<Block> {
    parse_blocks(&clean_generated_text(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fences_with_language_tag() {
        let input = "```markdown\n# Hello\nWorld\n```";
        assert_eq!(strip_outer_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn strip_fences_passthrough() {
        assert_eq!(strip_outer_fences("# Hello"), "# Hello");
    }

    #[test]
    fn line_endings_are_normalised() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn invisible_chars_are_removed() {
        assert_eq!(
            remove_invisible_chars("he\u{200B}llo\u{FEFF} wor\u{00AD}ld"),
            "hello world"
        );
    }

    #[test]
    fn headings_parse_with_level() {
        let blocks = parse_blocks("# One\n\n## Two\n\n### Three");
        assert_eq!(
            blocks,
            vec![
                Block::heading(1, "One"),
                Block::heading(2, "Two"),
                Block::heading(3, "Three"),
            ]
        );
    }

    #[test]
    fn deep_headings_clamp_to_three() {
        let blocks = parse_blocks("##### Too Deep");
        assert_eq!(blocks, vec![Block::heading(3, "Too Deep")]);
        // The constructor clamps, so the stored level is 3 either way.
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 3,
                text: "Too Deep".into()
            }
        );
    }

    #[test]
    fn bullet_markers_all_parse() {
        let blocks = parse_blocks("- a\n* b\n+ c");
        assert_eq!(
            blocks,
            vec![
                Block::Bullet("a".into()),
                Block::Bullet("b".into()),
                Block::Bullet("c".into()),
            ]
        );
    }

    #[test]
    fn numbered_items_keep_their_numbers() {
        let blocks = parse_blocks("1. first\n2) second");
        assert_eq!(
            blocks,
            vec![
                Block::Numbered {
                    number: 1,
                    text: "first".into()
                },
                Block::Numbered {
                    number: 2,
                    text: "second".into()
                },
            ]
        );
    }

    #[test]
    fn consecutive_plain_lines_merge_into_one_paragraph() {
        let blocks = parse_blocks("first line\nsecond line\n\nnext paragraph");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("first line second line".into()),
                Block::Paragraph("next paragraph".into()),
            ]
        );
    }

    #[test]
    fn source_order_is_preserved() {
        let text = "# Intro\npara one\n- item\n1. step\n## Next";
        let blocks = parse_blocks(text);
        assert_eq!(blocks.len(), 5);
        assert!(matches!(blocks[0], Block::Heading { level: 1, .. }));
        assert!(matches!(blocks[1], Block::Paragraph(_)));
        assert!(matches!(blocks[2], Block::Bullet(_)));
        assert!(matches!(blocks[3], Block::Numbered { .. }));
        assert!(matches!(blocks[4], Block::Heading { level: 2, .. }));
    }

    #[test]
    fn inline_emphasis_is_stripped() {
        let blocks = parse_blocks("This is **bold** and `code`.");
        assert_eq!(blocks, vec![Block::Paragraph("This is bold and code.".into())]);
    }

    #[test]
    fn empty_heading_lines_are_skipped() {
        assert!(parse_blocks("#\n##   ").is_empty());
    }

    #[test]
    fn full_pipeline_cleans_then_parses() {
        let raw = "```markdown\r\n# Title\r\n\r\n\r\n\r\nBody text.   \r\n```";
        let blocks = blocks_from_generated(raw);
        assert_eq!(
            blocks,
            vec![
                Block::heading(1, "Title"),
                Block::Paragraph("Body text.".into()),
            ]
        );
    }
}
