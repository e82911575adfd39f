//! LaTeX export with a BibTeX companion file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::{ExportFormat, Exporter, PaperMetadata, ordered_sections, output_path, paragraphs};
use crate::core::{CitationStyle, Draft, SectionKind};
use crate::error::ExportError;

const BIB_STUB: &str = "% Bibliography for the research paper.\n\
% The formatted reference list is included in the document body;\n\
% add BibTeX entries here to switch to \\cite-based references.\n";

/// Writes a `.tex` document and a `.bib` stub next to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexExporter;

/// BibTeX style matching a citation style.
#[must_use]
pub const fn bibliography_style(style: CitationStyle) -> &'static str {
    match style {
        CitationStyle::Apa => "apalike",
        CitationStyle::Mla => "plain",
        CitationStyle::Chicago => "chicago",
        CitationStyle::Ieee => "IEEEtran",
        CitationStyle::Harvard => "agsm",
    }
}

/// Escapes LaTeX special characters.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            other => out.push(other),
        }
    }
    out
}

impl Exporter for LatexExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Latex
    }

    fn render(&self, draft: &Draft, metadata: &PaperMetadata) -> Result<Vec<u8>, ExportError> {
        let mut body = String::new();
        for (kind, text) in ordered_sections(draft) {
            let paras: Vec<String> = paragraphs(text).iter().map(|p| escape(p)).collect();
            let joined = paras.join("\n\n");
            let _ = match kind {
                SectionKind::Abstract => {
                    writeln!(body, "\\begin{{abstract}}\n{joined}\n\\end{{abstract}}\n")
                }
                SectionKind::References => {
                    writeln!(body, "\\section*{{{}}}\n{joined}\n", kind.title())
                }
                _ => writeln!(body, "\\section{{{}}}\n{joined}\n", kind.title()),
            };
        }

        let doc = format!(
            "\\documentclass[12pt,a4paper]{{article}}\n\
\n\
\\usepackage[utf8]{{inputenc}}\n\
\\usepackage[T1]{{fontenc}}\n\
\\usepackage{{times}}\n\
\\usepackage{{setspace}}\n\
\\usepackage{{geometry}}\n\
\\usepackage{{natbib}}\n\
\\usepackage{{hyperref}}\n\
\n\
\\geometry{{margin=2.5cm}}\n\
\\doublespacing\n\
\n\
% Citation style: {style}\n\
\\bibliographystyle{{{bibstyle}}}\n\
\n\
\\title{{{title}}}\n\
\\author{{}}\n\
\\date{{}}\n\
\n\
\\begin{{document}}\n\
\n\
\\maketitle\n\
\n\
{body}\
\\end{{document}}\n",
            style = metadata.citation_style,
            bibstyle = bibliography_style(metadata.citation_style),
            title = escape(&metadata.title),
        );
        Ok(doc.into_bytes())
    }

    fn export(
        &self,
        draft: &Draft,
        metadata: &PaperMetadata,
        output_dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        if !draft.has_content() {
            return Err(ExportError::EmptyDraft);
        }
        let tex = self.render(draft, metadata)?;
        let path = output_path(output_dir, &metadata.title, self.format().extension())?;
        std::fs::write(&path, tex)?;
        std::fs::write(path.with_extension("bib"), BIB_STUB)?;
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::super::tests::{sample_draft, sample_metadata};
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("50% of $x_1$ & #2"), "50\\% of \\$x\\_1\\$ \\& \\#2");
        assert_eq!(escape("a\\b{c}"), "a\\textbackslash{}b\\{c\\}");
        assert_eq!(escape("~^"), "\\textasciitilde{}\\textasciicircum{}");
    }

    #[test]
    fn test_bibliography_style_map() {
        assert_eq!(bibliography_style(CitationStyle::Apa), "apalike");
        assert_eq!(bibliography_style(CitationStyle::Mla), "plain");
        assert_eq!(bibliography_style(CitationStyle::Chicago), "chicago");
        assert_eq!(bibliography_style(CitationStyle::Ieee), "IEEEtran");
        assert_eq!(bibliography_style(CitationStyle::Harvard), "agsm");
    }

    #[test]
    fn test_render_document() {
        let bytes = LatexExporter
            .render(&sample_draft(), &sample_metadata())
            .unwrap_or_else(|_| unreachable!());
        let tex = String::from_utf8(bytes).unwrap_or_else(|_| unreachable!());
        assert!(tex.starts_with("\\documentclass[12pt,a4paper]{article}"));
        assert!(tex.contains("\\bibliographystyle{apalike}"));
        assert!(tex.contains("\\title{Soil Carbon: A Review}"));
        assert!(tex.contains("\\begin{abstract}\nWe study soil \\& carbon.\n\\end{abstract}"));
        assert!(tex.contains("\\section{Introduction}\nFirst paragraph.\n\nSecond *emphasised* paragraph."));
        assert!(tex.contains("\\section*{References}"));
        assert!(!tex.contains("Methodology"));
        assert!(tex.trim_end().ends_with("\\end{document}"));
    }

    #[test]
    fn test_export_writes_bib_stub() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = LatexExporter
            .export(&sample_draft(), &sample_metadata(), dir.path())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("tex"));
        let bib = std::fs::read_to_string(path.with_extension("bib")).unwrap_or_default();
        assert!(bib.starts_with("% Bibliography"));
    }
}
