//! Word (`.docx`) export.
//!
//! Writes a minimal WordprocessingML package: content types, the package
//! relationship and `word/document.xml`. Formatting is direct run
//! properties, so no styles part is needed.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{ExportFormat, Exporter, PaperMetadata, ordered_sections, paragraphs, plain_text};
use crate::core::Draft;
use crate::error::ExportError;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Font sizes in half-points.
const TITLE_SIZE: u32 = 36;
const HEADING_SIZE: u32 = 28;
const META_SIZE: u32 = 20;

/// Writes a `.docx` package.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExporter;

/// Escapes XML text content.
#[must_use]
pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn paragraph(text: &str, bold: bool, size: Option<u32>, centered: bool) -> String {
    let mut ppr = String::new();
    if centered {
        ppr.push_str("<w:pPr><w:jc w:val=\"center\"/></w:pPr>");
    }
    let mut rpr = String::new();
    if bold {
        rpr.push_str("<w:b/>");
    }
    if let Some(size) = size {
        rpr.push_str(&format!("<w:sz w:val=\"{size}\"/>"));
    }
    let rpr = if rpr.is_empty() {
        rpr
    } else {
        format!("<w:rPr>{rpr}</w:rPr>")
    };
    format!(
        "<w:p>{ppr}<w:r>{rpr}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        xml_escape(text)
    )
}

/// Builds `word/document.xml`.
#[must_use]
pub fn document_xml(draft: &Draft, metadata: &PaperMetadata) -> String {
    let mut body = String::new();
    body.push_str(&paragraph(&metadata.title, true, Some(TITLE_SIZE), true));
    body.push_str(&paragraph(
        &format!(
            "Citation style: {} | Words: {}",
            metadata.citation_style, metadata.word_count
        ),
        false,
        Some(META_SIZE),
        true,
    ));
    for (kind, text) in ordered_sections(draft) {
        body.push_str(&paragraph(kind.title(), true, Some(HEADING_SIZE), false));
        for para in paragraphs(text) {
            body.push_str(&paragraph(&plain_text(&para), false, None, false));
        }
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{body}</w:body></w:document>"
    )
}

impl Exporter for DocxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn render(&self, draft: &Draft, metadata: &PaperMetadata) -> Result<Vec<u8>, ExportError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS.as_bytes())?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(document_xml(draft, metadata).as_bytes())?;

        Ok(zip.finish()?.into_inner())
    }
}
