//! Sanitizers: merge the two extraction passes into one clean record

pub mod diagram;
pub mod paragraph;
pub mod table;

use log::info;
use std::collections::HashMap;

use crate::document::records::{ContainerExtraction, ContentExtraction, SanitizedDocument};

pub use diagram::sanitize_drawing;
pub use paragraph::sanitize_paragraphs;
pub use table::sanitize_table;

/// Build the sanitized record. `content` is `None` when the object-model pass
/// could not read the file; the XML pass then supplies every run.
pub fn sanitize_document(
    container: &ContainerExtraction,
    content: Option<&ContentExtraction>,
) -> SanitizedDocument {
    let content_paragraphs = content.map(|c| c.paragraphs.as_slice()).unwrap_or_default();
    let paragraphs = sanitize_paragraphs(&container.paragraphs, content_paragraphs);

    let text_at: HashMap<usize, &str> = paragraphs
        .iter()
        .map(|p| (p.doc_index, p.text.as_str()))
        .collect();
    let preceding = |doc_index: usize| {
        doc_index
            .checked_sub(1)
            .and_then(|i| text_at.get(&i))
            .map(|t| t.to_string())
    };

    let tables = container
        .tables
        .iter()
        .map(|t| sanitize_table(t, preceding(t.doc_index)))
        .collect::<Vec<_>>();
    let drawings = container
        .drawings
        .iter()
        .map(|d| sanitize_drawing(d, preceding(d.doc_index)))
        .collect::<Vec<_>>();

    info!(
        "sanitized {} paragraphs, {} tables, {} drawings",
        paragraphs.len(),
        tables.len(),
        drawings.len()
    );

    SanitizedDocument {
        tables,
        drawings,
        headers: container.headers.clone(),
        footers: container.footers.clone(),
        relationships: container.relationships.clone(),
        inline_images: content.map(|c| c.inline_images.clone()).unwrap_or_default(),
        page_count: container.page_count,
        core_properties: container.core_properties.clone(),
        body_len: container.body_len,
        paragraphs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::records::{RawCell, RawParagraph, RawTable};

    #[test]
    fn test_tables_get_preceding_paragraph_text() {
        let container = ContainerExtraction {
            paragraphs: vec![RawParagraph {
                doc_index: 0,
                text: "Approval table".into(),
                runs: vec![crate::document::models::FormattedRun {
                    text: "Approval table".into(),
                    formatting: Default::default(),
                }],
                ..Default::default()
            }],
            tables: vec![RawTable {
                id: "tbl_1".into(),
                doc_index: 1,
                rows: vec![vec![RawCell {
                    text: "Name".into(),
                    column_span: 1,
                    v_merge: None,
                }]],
            }],
            body_len: 2,
            ..Default::default()
        };

        let doc = sanitize_document(&container, None);
        assert_eq!(doc.paragraphs.len(), 1);
        assert_eq!(doc.tables[0].preceding_text.as_deref(), Some("Approval table"));
        assert_eq!(doc.body_len, 2);
        assert!(doc.inline_images.is_empty());
    }
}
