//! Markdown export.

use super::{ExportFormat, Exporter, PaperMetadata};
use crate::core::Draft;
use crate::error::ExportError;

/// Writes the draft as a single markdown document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn render(&self, draft: &Draft, metadata: &PaperMetadata) -> Result<Vec<u8>, ExportError> {
        let mut out = format!("# {}\n\n", metadata.title);
        out.push_str(&format!(
            "*Citation style: {} | Words: {}*\n\n",
            metadata.citation_style, metadata.word_count
        ));
        out.push_str(&draft.full_text());
        Ok(out.trim_end().as_bytes().to_vec())
    }
}
