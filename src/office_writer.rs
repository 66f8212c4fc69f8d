//! Minimal OOXML package builders for the Excel and Word output formats.
//!
//! Both formats are zip containers around a handful of XML parts. Cell and
//! run text is stored inline (no shared-strings table), which every consumer
//! of the format accepts.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const DOC_RELS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// One block of a generated Word document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocBlock {
    /// Bold source-attribution paragraph
    Heading(String),
    Paragraph(String),
}

/// Builds an `.xlsx` package with a single worksheet named "Merged",
/// one row per entry of `rows`.
pub fn build_xlsx(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut sheet = String::new();
    sheet.push_str(&format!(r#"<worksheet xmlns="{}"><sheetData>"#, SPREADSHEET_NS));
    for (i, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, i + 1));
        for cell in row {
            sheet.push_str(&format!(
                r#"<c t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                xml_escape(cell)
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let content_types = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="{ns}">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            r#"</Types>"#
        ),
        ns = CONTENT_TYPES_NS
    );

    let root_rels = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="{ns}">"#,
            r#"<Relationship Id="rId1" Type="{doc_ns}/officeDocument" Target="xl/workbook.xml"/>"#,
            r#"</Relationships>"#
        ),
        ns = RELS_NS,
        doc_ns = DOC_RELS_NS
    );

    let workbook = format!(
        concat!(
            r#"<workbook xmlns="{ns}" xmlns:r="{doc_ns}">"#,
            r#"<sheets><sheet name="Merged" sheetId="1" r:id="rId1"/></sheets>"#,
            r#"</workbook>"#
        ),
        ns = SPREADSHEET_NS,
        doc_ns = DOC_RELS_NS
    );

    let workbook_rels = format!(
        concat!(
            r#"<Relationships xmlns="{ns}">"#,
            r#"<Relationship Id="rId1" Type="{doc_ns}/worksheet" Target="worksheets/sheet1.xml"/>"#,
            r#"</Relationships>"#
        ),
        ns = RELS_NS,
        doc_ns = DOC_RELS_NS
    );

    write_package(&[
        ("[Content_Types].xml", &content_types),
        ("_rels/.rels", &root_rels),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", &workbook_rels),
        ("xl/worksheets/sheet1.xml", &sheet),
    ])
}

/// Builds a `.docx` package, one paragraph per block. Headings are rendered
/// as bold runs.
pub fn build_docx(blocks: &[DocBlock]) -> Result<Vec<u8>> {
    let mut body = String::new();
    for block in blocks {
        match block {
            DocBlock::Heading(text) => {
                body.push_str(&format!(
                    r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    xml_escape(text)
                ));
            }
            DocBlock::Paragraph(text) => {
                body.push_str(&format!(
                    r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    xml_escape(text)
                ));
            }
        }
    }

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
        WORD_NS, body
    );

    let content_types = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="{ns}">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
            r#"</Types>"#
        ),
        ns = CONTENT_TYPES_NS
    );

    let root_rels = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="{ns}">"#,
            r#"<Relationship Id="rId1" Type="{doc_ns}/officeDocument" Target="word/document.xml"/>"#,
            r#"</Relationships>"#
        ),
        ns = RELS_NS,
        doc_ns = DOC_RELS_NS
    );

    write_package(&[
        ("[Content_Types].xml", &content_types),
        ("_rels/.rels", &root_rels),
        ("word/document.xml", &document),
    ])
}

fn write_package(entries: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content.as_bytes()).map_err(|e| {
            crate::error::AppError::new_io_error(e, None, format!("Failed to write zip entry {}", name))
        })?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn xlsx_package_has_the_expected_parts() {
        let bytes = build_xlsx(&[vec!["a".to_string(), "b".to_string()]]).unwrap();
        let names = entry_names(&bytes);
        for expected in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/worksheets/sheet1.xml",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn xlsx_rows_become_inline_string_cells() {
        let bytes = build_xlsx(&[
            vec!["first".to_string()],
            vec!["second".to_string(), "third".to_string()],
        ])
        .unwrap();
        let sheet = read_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<row r="1">"#));
        assert!(sheet.contains(r#"<row r="2">"#));
        assert!(sheet.contains(">first</t>"));
        assert!(sheet.contains(">third</t>"));
    }

    #[test]
    fn cell_text_is_xml_escaped() {
        let bytes = build_xlsx(&[vec!["a < b & \"c\"".to_string()]]).unwrap();
        let sheet = read_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("a &lt; b &amp; &quot;c&quot;"));
        assert!(!sheet.contains("a < b"));
    }

    #[test]
    fn docx_headings_are_bold_runs() {
        let bytes = build_docx(&[
            DocBlock::Heading("source.txt".to_string()),
            DocBlock::Paragraph("line one".to_string()),
        ])
        .unwrap();
        let names = entry_names(&bytes);
        assert!(names.iter().any(|n| n == "word/document.xml"));

        let document = read_entry(&bytes, "word/document.xml");
        assert!(document.contains("<w:b/>"));
        assert!(document.contains(">source.txt</w:t>"));
        assert!(document.contains(">line one</w:t>"));
    }
}
