//! DOCX text: body paragraphs first, then body tables row by row.
//!
//! Only top-level body content is walked (runs and hyperlink runs). Text in
//! headers, footers, footnotes and text boxes is not included.

use crate::error::ExtractionError;
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use tracing::debug;

/// Extract text from DOCX bytes.
///
/// Layout of the result:
/// - each body paragraph's text followed by `\n`
/// - then for each table row: every cell's text followed by a space, then `\n`
///
/// An empty document yields `Ok("")`.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx {
        detail: e.to_string(),
    })?;

    let mut text = String::new();
    let mut tables: Vec<&Table> = Vec::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                text.push_str(&paragraph_text(p));
                text.push('\n');
            }
            DocumentChild::Table(t) => tables.push(t),
            _ => {}
        }
    }

    for table in tables {
        for row in &table.rows {
            let TableChild::TableRow(row) = row else {
                continue;
            };
            for cell in &row.cells {
                let TableRowChild::TableCell(cell) = cell else {
                    continue;
                };
                let cell_text: Vec<String> = cell
                    .children
                    .iter()
                    .filter_map(|c| match c {
                        TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                        _ => None,
                    })
                    .collect();
                text.push_str(&cell_text.join("\n"));
                text.push(' ');
            }
            text.push('\n');
        }
    }

    debug!("Extracted {} characters from DOCX", text.chars().count());
    Ok(text)
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    push_children(&paragraph.children, &mut out);
    out
}

/// Runs, including those nested in hyperlinks, in document order.
fn push_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_children(&link.children, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Hyperlink, HyperlinkType, Run, TableCell, TableRow};
    use std::io::Cursor;

    fn pack(docx: Docx) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).expect("pack docx");
        buf.into_inner()
    }

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(para(text))
    }

    #[test]
    fn paragraphs_then_tables() {
        let table = docx_rs::Table::new(vec![
            TableRow::new(vec![cell("Exams"), cell("60%")]),
            TableRow::new(vec![cell("Homework"), cell("40%")]),
        ]);
        let bytes = pack(
            Docx::new()
                .add_paragraph(para("CS101 Syllabus"))
                .add_table(table)
                .add_paragraph(para("Office hours Mon")),
        );

        let text = extract_docx(&bytes).unwrap();
        assert_eq!(
            text,
            "CS101 Syllabus\nOffice hours Mon\nExams 60% \nHomework 40% \n"
        );
    }

    #[test]
    fn runs_are_concatenated() {
        let bytes = pack(Docx::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Intro"))
                .add_run(Run::new().add_text("duction")),
        ));
        assert_eq!(extract_docx(&bytes).unwrap(), "Introduction\n");
    }

    #[test]
    fn hyperlink_text_is_kept() {
        let link = Hyperlink::new("contact", HyperlinkType::Anchor)
            .add_run(Run::new().add_text("ada@example.edu"));
        let bytes = pack(Docx::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Email:"))
                .add_hyperlink(link),
        ));
        let text = extract_docx(&bytes).unwrap();
        assert!(text.starts_with("Email:"), "got: {text:?}");
        assert!(text.contains("ada@example.edu"), "got: {text:?}");
    }

    #[test]
    fn empty_document_is_empty_text() {
        assert_eq!(extract_docx(&pack(Docx::new())).unwrap(), "");
    }

    #[test]
    fn table_only_document_yields_rows() {
        let table = docx_rs::Table::new(vec![
            TableRow::new(vec![cell("Week 1"), cell("Intro")]),
            TableRow::new(vec![cell("Week 2"), cell("HW1 due")]),
        ]);
        let bytes = pack(Docx::new().add_table(table));
        assert_eq!(
            extract_docx(&bytes).unwrap(),
            "Week 1 Intro \nWeek 2 HW1 due \n"
        );
    }

    #[test]
    fn not_a_docx() {
        let err = extract_docx(b"plain text, not a zip").unwrap_err();
        assert!(matches!(err, ExtractionError::Docx { .. }));
    }
}
