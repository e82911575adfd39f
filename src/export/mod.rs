//! Document export.
//!
//! Every format implements [`Exporter`]: render the draft to bytes, then
//! write them to `<output_dir>/<safe title>.<ext>`. Formats are independent;
//! [`export_all`] records a failure for one format and carries on with the
//! rest.

pub mod docx;
pub mod latex;
pub mod markdown;
pub mod pdf;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::core::{CitationStyle, Draft, SectionKind, Session};
use crate::error::ExportError;

pub use docx::DocxExporter;
pub use latex::LatexExporter;
pub use markdown::MarkdownExporter;
pub use pdf::PdfExporter;

/// Characters of the title kept in file names.
const FILENAME_TITLE_CHARS: usize = 50;
/// File stem used when the title has no usable characters.
const FALLBACK_STEM: &str = "paper";

/// Output document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Paginated PDF.
    Pdf,
    /// Word document.
    Docx,
    /// LaTeX source with a BibTeX companion.
    Latex,
    /// Markdown.
    Markdown,
}

impl ExportFormat {
    /// All formats.
    pub const ALL: [Self; 4] = [Self::Pdf, Self::Docx, Self::Latex, Self::Markdown];

    /// Parses a format name (case-insensitive; `tex` and `md` accepted).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "latex" | "tex" => Some(Self::Latex),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Latex => "latex",
            Self::Markdown => "markdown",
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Latex => "tex",
            Self::Markdown => "md",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ExportError::UnknownFormat(s.to_string()))
    }
}

/// Document-level metadata passed to every exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperMetadata {
    /// Paper title.
    pub title: String,
    /// Citation style used in the text.
    pub citation_style: CitationStyle,
    /// Total words in the draft.
    pub word_count: usize,
}

impl PaperMetadata {
    /// Metadata for a session's draft.
    #[must_use]
    pub fn for_draft(session: &Session, draft: &Draft) -> Self {
        let title = if session.title.trim().is_empty() {
            session.topic.clone()
        } else {
            session.title.clone()
        };
        Self {
            title,
            citation_style: session.citation_style,
            word_count: draft.word_count(),
        }
    }
}

/// A document format writer.
pub trait Exporter: Send + Sync {
    /// Format produced.
    fn format(&self) -> ExportFormat;

    /// Renders the document.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the document cannot be assembled.
    fn render(&self, draft: &Draft, metadata: &PaperMetadata) -> Result<Vec<u8>, ExportError>;

    /// Writes the document into `output_dir` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::EmptyDraft`] for a draft without content, or
    /// an I/O error if the file cannot be written.
    fn export(
        &self,
        draft: &Draft,
        metadata: &PaperMetadata,
        output_dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        if !draft.has_content() {
            return Err(ExportError::EmptyDraft);
        }
        let bytes = self.render(draft, metadata)?;
        let path = output_path(output_dir, &metadata.title, self.format().extension())?;
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Returns the exporter for a format.
#[must_use]
pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Pdf => Box::new(PdfExporter),
        ExportFormat::Docx => Box::new(DocxExporter),
        ExportFormat::Latex => Box::new(LatexExporter),
        ExportFormat::Markdown => Box::new(MarkdownExporter),
    }
}

/// Files written and formats that failed during one export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    /// Successfully written files.
    pub files: Vec<(ExportFormat, PathBuf)>,
    /// Formats that failed, with the error message.
    pub failures: Vec<(ExportFormat, String)>,
}

/// Exports the draft in every requested format.
///
/// A failing format is logged and recorded; it never prevents the others.
pub fn export_all(
    draft: &Draft,
    metadata: &PaperMetadata,
    formats: &[ExportFormat],
    output_dir: &Path,
) -> ExportSummary {
    let mut summary = ExportSummary::default();
    for &format in formats {
        match exporter_for(format).export(draft, metadata, output_dir) {
            Ok(path) => {
                info!(format = %format, path = %path.display(), "Exported");
                summary.files.push((format, path));
            }
            Err(e) => {
                error!(format = %format, error = %e, "Export failed");
                summary.failures.push((format, e.to_string()));
            }
        }
    }
    summary
}

/// File stem derived from a title.
///
/// Takes the first 50 characters, replaces anything outside
/// `[A-Za-z0-9 -_]` with `_`, trims, then turns spaces into `_`.
#[must_use]
pub fn safe_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .take(FILENAME_TITLE_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = cleaned.trim().replace(' ', "_");
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Creates `output_dir` and returns the path for a document with `extension`.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn output_path(output_dir: &Path, title: &str, extension: &str) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    Ok(output_dir.join(format!("{}.{extension}", safe_filename(title))))
}

/// Sections to render, in document order, skipping blank ones.
pub(crate) fn ordered_sections(draft: &Draft) -> Vec<(SectionKind, &str)> {
    draft
        .populated_sections()
        .map(|(kind, text)| (kind, text.trim()))
        .collect()
}

/// Splits text into paragraphs on blank lines.
pub(crate) fn paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Removes markdown emphasis and heading markers for plain-text formats.
pub(crate) fn plain_text(paragraph: &str) -> String {
    paragraph
        .trim_start_matches('#')
        .trim_start()
        .replace("**", "")
        .replace('*', "")
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use test_case::test_case;
    use uuid::Uuid;

    pub fn sample_draft() -> Draft {
        let mut draft = Draft::new(Uuid::new_v4());
        draft.set_section(SectionKind::Abstract, "We study soil & carbon.");
        draft.set_section(SectionKind::Introduction, "First paragraph.\n\nSecond *emphasised* paragraph.");
        draft.set_section(SectionKind::Methodology, "   ");
        draft.set_section(SectionKind::References, "Smith, J. (2021). *Soil*.");
        draft
    }

    pub fn sample_metadata() -> PaperMetadata {
        PaperMetadata {
            title: "Soil Carbon: A Review".to_string(),
            citation_style: CitationStyle::Apa,
            word_count: 12,
        }
    }

    #[test_case("Soil Carbon: A Review", "Soil_Carbon__A_Review" ; "punctuation")]
    #[test_case("  padded  ", "padded" ; "trimmed")]
    #[test_case("???", "___" ; "all replaced")]
    #[test_case("", "paper" ; "empty")]
    #[test_case("Ünïcode Title", "_n_code_Title" ; "non ascii")]
    fn test_safe_filename(title: &str, expected: &str) {
        assert_eq!(safe_filename(title), expected);
    }

    #[test]
    fn test_safe_filename_truncates() {
        let title = "a".repeat(80);
        assert_eq!(safe_filename(&title).len(), 50);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("PDF"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::parse("tex"), Some(ExportFormat::Latex));
        assert_eq!(ExportFormat::parse("md"), Some(ExportFormat::Markdown));
        assert!("odt".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_paragraphs_and_plain_text() {
        let paras = paragraphs("one\ntwo\n\n\n\nthree");
        assert_eq!(paras, vec!["one two", "three"]);
        assert_eq!(plain_text("## **Bold** and *it*"), "Bold and it");
    }

    #[test]
    fn test_export_all_writes_every_format() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let summary = export_all(
            &sample_draft(),
            &sample_metadata(),
            &ExportFormat::ALL,
            dir.path(),
        );
        assert!(summary.failures.is_empty(), "{:?}", summary.failures);
        assert_eq!(summary.files.len(), 4);
        for (_, path) in &summary.files {
            assert!(path.exists());
        }
        assert!(dir.path().join("Soil_Carbon__A_Review.bib").exists());
    }

    #[test]
    fn test_failure_is_per_format() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "not a directory").unwrap_or_else(|_| unreachable!());

        let empty = Draft::new(Uuid::new_v4());
        let summary = export_all(&empty, &sample_metadata(), &[ExportFormat::Markdown], dir.path());
        assert_eq!(summary.failures.len(), 1);

        let summary = export_all(
            &sample_draft(),
            &sample_metadata(),
            &[ExportFormat::Markdown, ExportFormat::Pdf],
            &blocked,
        );
        assert_eq!(summary.failures.len(), 2);
        assert!(summary.files.is_empty());
    }
}
