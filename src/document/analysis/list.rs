//! List grouping and table wrapping
//!
//! A paragraph is a list item when, in priority order, it carries a list
//! hint from numbering, a numbering id, a list paragraph style or a textual
//! marker. Consecutive list paragraphs are grouped into one list block.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::document::cleanup::{normalize_whitespace, style_token};
use crate::document::models::{BlockContent, ContentBlock, ListData, ListScheme, TableData};
use crate::document::parsing::numbering::classify_num_format;
use crate::document::records::{ListKind, SanitizedParagraph, SanitizedTable};

/// Style tokens (see [`style_token`]) that mark a list paragraph.
const LIST_STYLE_TOKENS: &[&str] = &["listparagraph", "listbullet", "listnumber", "listcontinue"];

const BULLET_GLYPHS: &[char] = &['•', '·', '▪', '◦', '–', '—', '-', '*'];

static MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\(?\d+|\(?[ivxlcdm]+|\(?[a-zA-Z])[.)]\s+").unwrap());

/// List blocks plus the doc_index of every paragraph they absorbed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListComponents {
    pub lists: Vec<ContentBlock>,
    pub consumed: BTreeSet<usize>,
}

pub fn is_list_paragraph(para: &SanitizedParagraph) -> bool {
    para.list_type.is_some()
        || para.num_id.is_some()
        || para.style.as_deref().is_some_and(is_list_style)
        || has_text_marker(&para.text)
}

fn is_list_style(style: &str) -> bool {
    let token = style_token(style);
    // "ListBullet2" and friends
    let token = token.trim_end_matches(|c: char| c.is_ascii_digit());
    LIST_STYLE_TOKENS.contains(&token)
}

fn has_text_marker(text: &str) -> bool {
    let text = text.trim_start();
    MARKER_PATTERN.is_match(text) || text.starts_with(BULLET_GLYPHS)
}

/// `(ordered, scheme)` from the number format, then the list hint, then
/// the text itself.
pub fn classify_ordering(para: &SanitizedParagraph) -> (bool, ListScheme) {
    if let Some(format) = para.num_format.as_deref().filter(|f| !f.is_empty()) {
        return classify_num_format(format);
    }
    match para.list_type {
        Some(ListKind::Bullet) => (false, ListScheme::Bullet),
        Some(ListKind::Number) => (true, ListScheme::Decimal),
        None if para.text.trim_start().starts_with(BULLET_GLYPHS) => (false, ListScheme::Bullet),
        None => (true, ListScheme::Decimal),
    }
}

fn level(para: &SanitizedParagraph) -> u8 {
    para.ilvl.unwrap_or(0)
}

fn same_group(base: &SanitizedParagraph, next: &SanitizedParagraph) -> bool {
    if level(next) != level(base) {
        return false;
    }
    match base.num_id {
        Some(num_id) => next.num_id == Some(num_id),
        None => {
            let styles_match = match (&base.style, &next.style) {
                (Some(a), Some(b)) => style_token(a) == style_token(b),
                _ => false,
            };
            next.num_id.is_none()
                && styles_match
                && classify_ordering(next).0 == classify_ordering(base).0
        }
    }
}

/// Group list paragraphs. Paragraphs whose doc_index is in `headings` never
/// join a list and end any open group.
pub fn analyze_lists(
    paragraphs: &[SanitizedParagraph],
    headings: &BTreeSet<usize>,
) -> ListComponents {
    let mut ordered: Vec<&SanitizedParagraph> = paragraphs.iter().collect();
    ordered.sort_by_key(|p| p.doc_index);

    let is_item = |p: &SanitizedParagraph| !headings.contains(&p.doc_index) && is_list_paragraph(p);

    let mut components = ListComponents::default();
    let mut i = 0;
    while i < ordered.len() {
        let base = ordered[i];
        if !is_item(base) {
            i += 1;
            continue;
        }

        let (is_ordered, scheme) = classify_ordering(base);
        let mut items = vec![normalize_whitespace(&base.text)];
        let mut indices = vec![base.doc_index];
        components.consumed.insert(base.doc_index);
        i += 1;
        while let Some(&next) = ordered.get(i) {
            if !is_item(next) || !same_group(base, next) {
                break;
            }
            items.push(normalize_whitespace(&next.text));
            indices.push(next.doc_index);
            components.consumed.insert(next.doc_index);
            i += 1;
        }

        debug!(
            "list at {}: {} items, {:?}, level {}",
            base.doc_index,
            items.len(),
            scheme,
            level(base)
        );

        components.lists.push(ContentBlock {
            id: format!("list_{}", base.doc_index),
            doc_index: base.doc_index,
            content: BlockContent::List {
                list_data: ListData {
                    ordered: is_ordered,
                    scheme,
                    level: level(base),
                    num_id: base.num_id,
                    items,
                    item_doc_indices: indices,
                },
            },
        });
    }

    components
}

/// One table block per sanitized table.
pub fn analyze_tables(tables: &[SanitizedTable]) -> Vec<ContentBlock> {
    tables
        .iter()
        .map(|table| ContentBlock {
            id: format!("table_{}", table.doc_index),
            doc_index: table.doc_index,
            content: BlockContent::Table {
                table: TableData {
                    doc_index: table.doc_index,
                    rows: table.rows,
                    cols: table.cols,
                    data: table.data.clone(),
                    preceding_text: table.preceding_text.clone(),
                },
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(doc_index: usize, text: &str) -> SanitizedParagraph {
        SanitizedParagraph {
            doc_index,
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn numbered(doc_index: usize, text: &str, num_id: u32, ilvl: u8, fmt: &str) -> SanitizedParagraph {
        SanitizedParagraph {
            num_id: Some(num_id),
            ilvl: Some(ilvl),
            num_format: Some(fmt.to_string()),
            list_type: Some(crate::document::parsing::numbering::list_kind_for_format(fmt)),
            ..para(doc_index, text)
        }
    }

    fn list_data(block: &ContentBlock) -> &ListData {
        match &block.content {
            BlockContent::List { list_data } => list_data,
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_numbering_groups_split_on_level_and_id() {
        let paragraphs = vec![
            para(0, "Intro"),
            numbered(1, "First", 3, 0, "decimal"),
            numbered(2, "Second", 3, 0, "decimal"),
            numbered(3, "Nested", 3, 1, "lowerRoman"),
            numbered(4, "Third", 3, 0, "decimal"),
            numbered(5, "Other list", 7, 0, "bullet"),
        ];
        let result = analyze_lists(&paragraphs, &BTreeSet::new());

        assert_eq!(result.lists.len(), 4);
        let first = list_data(&result.lists[0]);
        assert_eq!(first.items, vec!["First", "Second"]);
        assert_eq!(first.item_doc_indices, vec![1, 2]);
        assert!(first.ordered);

        let nested = list_data(&result.lists[1]);
        assert_eq!(nested.scheme, ListScheme::Roman);
        assert_eq!(nested.level, 1);

        let bullets = list_data(&result.lists[3]);
        assert!(!bullets.ordered);
        assert_eq!(bullets.scheme, ListScheme::Bullet);
        assert_eq!(result.lists[3].id, "list_5");

        assert_eq!(
            result.consumed.iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_style_driven_group() {
        let styled = |i, t| SanitizedParagraph {
            style: Some("List Paragraph".into()),
            ..para(i, t)
        };
        let paragraphs = vec![styled(0, "alpha"), styled(1, "beta"), para(2, "plain")];
        let result = analyze_lists(&paragraphs, &BTreeSet::new());
        assert_eq!(result.lists.len(), 1);
        assert_eq!(list_data(&result.lists[0]).items, vec!["alpha", "beta"]);
        assert!(!result.consumed.contains(&2));
    }

    #[test]
    fn test_text_markers_become_single_item_lists() {
        let paragraphs = vec![para(0, "• apples"), para(1, "a) pears")];
        let result = analyze_lists(&paragraphs, &BTreeSet::new());
        assert_eq!(result.lists.len(), 2);
        assert_eq!(list_data(&result.lists[0]).scheme, ListScheme::Bullet);
        assert!(list_data(&result.lists[1]).ordered);
    }

    #[test]
    fn test_headings_never_join_lists() {
        let paragraphs = vec![para(0, "1. Purpose"), para(1, "Text")];
        let headings = BTreeSet::from([0]);
        let result = analyze_lists(&paragraphs, &headings);
        assert!(result.lists.is_empty());
        assert!(result.consumed.is_empty());
    }

    #[test]
    fn test_list_style_with_level_suffix() {
        assert!(is_list_style("ListBullet2"));
        assert!(is_list_style("list_number"));
        assert!(!is_list_style("Heading1"));
    }

    #[test]
    fn test_analyze_tables_wraps_each_table() {
        let tables = vec![SanitizedTable {
            id: "tbl_4".into(),
            doc_index: 4,
            rows: 1,
            cols: 2,
            data: vec![vec!["a".into(), "b".into()]],
            preceding_text: None,
        }];
        let blocks = analyze_tables(&tables);
        assert_eq!(blocks[0].id, "table_4");
        assert_eq!(blocks[0].kind(), "table");
    }
}
