//! Paragraph union of the container and content passes
//!
//! Both passes assign doc_index the same way, so the merge is keyed on it.
//! Numbering comes from the XML pass; rich runs come from the content pass
//! when it read the same text.

use log::debug;
use std::collections::BTreeMap;

use crate::document::cleanup::{clean_run_text, collapse_spaces, normalize_whitespace};
use crate::document::models::FormattedRun;
use crate::document::records::{RawParagraph, SanitizedParagraph};

#[derive(Default)]
struct Pair<'a> {
    xml: Option<&'a RawParagraph>,
    content: Option<&'a RawParagraph>,
}

/// Merge the two paragraph sequences into one record per doc_index.
pub fn sanitize_paragraphs(
    xml_pass: &[RawParagraph],
    content_pass: &[RawParagraph],
) -> Vec<SanitizedParagraph> {
    let mut by_index: BTreeMap<usize, Pair> = BTreeMap::new();
    for para in xml_pass {
        by_index.entry(para.doc_index).or_default().xml = Some(para);
    }
    for para in content_pass {
        by_index.entry(para.doc_index).or_default().content = Some(para);
    }

    by_index
        .into_iter()
        .filter_map(|(doc_index, pair)| merge_pair(doc_index, pair))
        .collect()
}

fn merge_pair(doc_index: usize, pair: Pair) -> Option<SanitizedParagraph> {
    let runs = match (pair.xml, pair.content) {
        (Some(xml), Some(content)) => {
            if normalize_whitespace(&xml.text) == normalize_whitespace(&content.text) {
                &content.runs
            } else {
                debug!("doc_index {doc_index}: passes disagree on text, keeping XML runs");
                &xml.runs
            }
        }
        (Some(only), None) | (None, Some(only)) => &only.runs,
        (None, None) => return None,
    };
    let runs = clean_runs(runs);

    let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
    let text = collapse_spaces(&joined).trim().to_string();
    if text.is_empty() {
        return None;
    }

    let numbering_source = pair.xml.or(pair.content)?;
    let style = pair
        .xml
        .and_then(|p| p.style.clone())
        .or_else(|| pair.content.and_then(|p| p.style.clone()));

    Some(SanitizedParagraph {
        doc_index,
        text,
        runs,
        style,
        num_id: numbering_source.num_id,
        ilvl: numbering_source.ilvl,
        num_format: numbering_source.num_format.clone(),
        lvl_text: numbering_source.lvl_text.clone(),
        list_type: numbering_source.list_type,
        page_hint: pair.xml.and_then(|p| p.page_hint),
    })
}

/// Clean every run, drop the empty ones and coalesce identical neighbours.
fn clean_runs(runs: &[FormattedRun]) -> Vec<FormattedRun> {
    let cleaned: Vec<FormattedRun> = runs
        .iter()
        .map(|run| FormattedRun {
            text: clean_run_text(&run.text),
            formatting: run.formatting.clone(),
        })
        .filter(|run| !run.text.is_empty())
        .collect();

    FormattedRun::consolidate_runs(cleaned)
        .into_iter()
        .map(|mut run| {
            run.text = collapse_spaces(&run.text);
            run
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::models::TextFormatting;
    use crate::document::records::ListKind;

    fn run(text: &str, bold: bool) -> FormattedRun {
        FormattedRun {
            text: text.to_string(),
            formatting: TextFormatting {
                bold,
                ..Default::default()
            },
        }
    }

    fn para(doc_index: usize, runs: Vec<FormattedRun>) -> RawParagraph {
        let text = runs.iter().map(|r| r.text.as_str()).collect();
        RawParagraph {
            doc_index,
            text,
            runs,
            ..Default::default()
        }
    }

    #[test]
    fn test_numbering_from_xml_runs_from_content() {
        let mut xml = para(2, vec![run("Item one", false)]);
        xml.num_id = Some(4);
        xml.ilvl = Some(1);
        xml.num_format = Some("decimal".into());
        xml.list_type = Some(ListKind::Number);
        let content = para(2, vec![run("Item ", true), run("one", false)]);

        let merged = sanitize_paragraphs(&[xml], &[content]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].num_id, Some(4));
        assert_eq!(merged[0].ilvl, Some(1));
        assert_eq!(merged[0].list_type, Some(ListKind::Number));
        assert!(merged[0].runs[0].formatting.bold);
        assert_eq!(merged[0].text, "Item one");
    }

    #[test]
    fn test_mismatched_text_keeps_xml_runs() {
        let xml = para(0, vec![run("Full text", false)]);
        let content = para(0, vec![run("Other", true)]);
        let merged = sanitize_paragraphs(&[xml], &[content]);
        assert_eq!(merged[0].text, "Full text");
        assert!(!merged[0].runs[0].formatting.bold);
    }

    #[test]
    fn test_union_keeps_single_pass_paragraphs() {
        let xml = para(0, vec![run("Only xml", false)]);
        let content = para(3, vec![run("Only content", false)]);
        let merged = sanitize_paragraphs(&[xml], &[content]);
        let indices: Vec<usize> = merged.iter().map(|p| p.doc_index).collect();
        assert_eq!(indices, vec![0, 3]);
    }

    #[test]
    fn test_whitespace_collapsed_and_runs_coalesced() {
        let xml = para(
            1,
            vec![
                run("a\t", false),
                run("  b", false),
                run("\u{200B}", true),
                run(" c\r\n", true),
            ],
        );
        let merged = sanitize_paragraphs(&[xml], &[]);
        let p = &merged[0];
        assert_eq!(p.text, "a b c");
        assert_eq!(p.runs.len(), 2);
        assert_eq!(p.runs[0].text, "a b");
        assert!(!p.text.contains("  "));
    }

    #[test]
    fn test_blank_paragraph_dropped() {
        let xml = para(0, vec![run(" \t ", false)]);
        assert!(sanitize_paragraphs(&[xml], &[]).is_empty());
    }
}
