//! PDF export.
//!
//! Produces a PDF 1.4 file using the base-14 Times fonts, so nothing has to
//! be embedded. Text is wrapped by character count against an average glyph
//! width and paginated onto A4 pages.

use std::fmt::Write as _;

use super::{ExportFormat, Exporter, PaperMetadata, ordered_sections, paragraphs, plain_text};
use crate::core::Draft;
use crate::error::ExportError;

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 72;
const FOOTER_Y: u32 = 40;

/// Typeset line kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Meta,
    Heading,
    Body,
}

impl Style {
    const fn font(self) -> &'static str {
        match self {
            Self::Title | Self::Heading => "F2",
            Self::Meta | Self::Body => "F1",
        }
    }

    const fn size(self) -> u32 {
        match self {
            Self::Title => 18,
            Self::Heading => 14,
            Self::Meta => 10,
            Self::Body => 11,
        }
    }

    /// Vertical space consumed by one line.
    const fn leading(self) -> u32 {
        self.size() + self.size() / 2
    }

    /// Characters per line at this size, assuming half-em average glyphs.
    const fn wrap_width(self) -> usize {
        ((PAGE_WIDTH - 2 * MARGIN) * 2 / self.size()) as usize
    }
}

/// A line ready to place, or vertical space.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Text(Style, String),
    Gap(u32),
}

/// Writes a `.pdf` document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExporter;

/// Greedy word wrap to at most `width` characters per line.
#[must_use]
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escapes a string for a PDF literal, mapping to WinAnsi where possible.
#[must_use]
pub fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", u32::from(c));
            }
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201c}' | '\u{201d}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            _ => out.push('?'),
        }
    }
    out
}

fn push_wrapped(lines: &mut Vec<Line>, style: Style, text: &str) {
    for row in wrap(text, style.wrap_width()) {
        lines.push(Line::Text(style, row));
    }
}

fn layout(draft: &Draft, metadata: &PaperMetadata) -> Vec<Line> {
    let mut lines = Vec::new();
    push_wrapped(&mut lines, Style::Title, &metadata.title);
    push_wrapped(
        &mut lines,
        Style::Meta,
        &format!(
            "Citation style: {} | Words: {}",
            metadata.citation_style, metadata.word_count
        ),
    );
    for (kind, text) in ordered_sections(draft) {
        lines.push(Line::Gap(Style::Body.leading()));
        push_wrapped(&mut lines, Style::Heading, kind.title());
        for para in paragraphs(text) {
            lines.push(Line::Gap(Style::Body.size() / 2));
            push_wrapped(&mut lines, Style::Body, &plain_text(&para));
        }
    }
    lines
}

/// Splits laid-out lines into page content streams.
fn paginate(lines: &[Line]) -> Vec<String> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages = Vec::new();
    let mut stream = String::new();
    let mut y = top;

    for line in lines {
        let needed = match line {
            Line::Text(style, _) => style.leading(),
            Line::Gap(space) => *space,
        };
        if y < MARGIN + needed {
            pages.push(std::mem::take(&mut stream));
            y = top;
            if matches!(line, Line::Gap(_)) {
                continue;
            }
        }
        y -= needed;
        if let Line::Text(style, text) = line {
            let _ = writeln!(
                stream,
                "BT /{} {} Tf {MARGIN} {y} Td ({}) Tj ET",
                style.font(),
                style.size(),
                escape_pdf_text(text)
            );
        }
    }
    if !stream.is_empty() || pages.is_empty() {
        pages.push(stream);
    }

    let total = pages.len();
    for (i, page) in pages.iter_mut().enumerate() {
        let _ = writeln!(
            page,
            "BT /F1 9 Tf {} {FOOTER_Y} Td (Page {} of {total}) Tj ET",
            PAGE_WIDTH / 2 - 24,
            i + 1
        );
    }
    pages
}

/// Serializes page content streams into a complete PDF file.
fn assemble(pages: &[String], title: &str) -> Vec<u8> {
    let page_count = pages.len();
    let first_page_obj = 6;
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", first_page_obj + 2 * i))
        .collect();

    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        format!("<< /Type /Pages /Kids [{}] /Count {page_count} >>", kids.join(" ")).into_bytes(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Times-Roman /Encoding /WinAnsiEncoding >>".to_vec(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Times-Bold /Encoding /WinAnsiEncoding >>".to_vec(),
        format!("<< /Title ({}) /Producer (academician) >>", escape_pdf_text(title)).into_bytes(),
    ];
    for (i, content) in pages.iter().enumerate() {
        let content_obj = first_page_obj + 2 * i + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
/Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_obj} 0 R >>"
            )
            .into_bytes(),
        );
        objects.push(
            format!(
                "<< /Length {} >>\nstream\n{content}endstream",
                content.len()
            )
            .into_bytes(),
        );
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

impl Exporter for PdfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, draft: &Draft, metadata: &PaperMetadata) -> Result<Vec<u8>, ExportError> {
        let lines = layout(draft, metadata);
        let pages = paginate(&lines);
        Ok(assemble(&pages, &metadata.title))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::super::tests::{sample_draft, sample_metadata};
    use super::*;
    use crate::core::SectionKind;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap("averyveryverylongword x", 5), vec!["averyveryverylongword", "x"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_escape_pdf_text() {
        assert_eq!(escape_pdf_text("f(x) \\ y"), "f\\(x\\) \\\\ y");
        assert_eq!(escape_pdf_text("caf\u{e9}"), "caf\\351");
        assert_eq!(escape_pdf_text("\u{201c}q\u{201d} \u{4e2d}"), "\"q\" ?");
    }

    #[test]
    fn test_render_structure() {
        let bytes = PdfExporter
            .render(&sample_draft(), &sample_metadata())
            .unwrap_or_else(|_| unreachable!());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/BaseFont /Times-Roman"));
        assert!(text.contains("(Soil Carbon: A Review) Tj"));
        assert!(text.contains("(Page 1 of 1) Tj"));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = PdfExporter
            .render(&sample_draft(), &sample_metadata())
            .unwrap_or_else(|_| unreachable!());
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let xref_start = text.rfind("xref\n").unwrap_or_else(|| unreachable!());
        let first_entry = text[xref_start..]
            .lines()
            .nth(3)
            .unwrap_or_else(|| unreachable!());
        let offset: usize = first_entry[..10].parse().unwrap_or_else(|_| unreachable!());
        assert!(bytes[offset..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn test_long_draft_paginates() {
        let mut draft = sample_draft();
        let para = "word ".repeat(200);
        let body = vec![para; 20].join("\n\n");
        draft.set_section(SectionKind::Analysis, body);
        let bytes = PdfExporter
            .render(&draft, &sample_metadata())
            .unwrap_or_else(|_| unreachable!());
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("/Count 1 "));
        assert!(text.contains("(Page 2 of"));
    }
}
