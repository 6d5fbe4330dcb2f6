//! Section tree from numbered headings
//!
//! Headings are recognized purely from paragraph text ("1.", "1.1", "제2장",
//! "Section 3"). The tree is built in one pass with a stack of open sections,
//! kept in an arena and materialized into owned [`Section`] values at the end.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::document::cleanup::normalize_whitespace;
use crate::document::models::Section;
use crate::document::records::SanitizedParagraph;

// Tried in order; the first match wins. Up to eight numeric groups.
static HEADING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Plain numbering: "1 Title", "1.2. Title", "2.1.3) Title"
        Regex::new(r"^\s*(\d+(?:\s*\.\s*\d+){0,7})[.)]?\s+(.*\S)\s*$").unwrap(),
        // Korean ordinal prefix and classifier suffix: "제 1 장 개요", "3절 정의"
        Regex::new(r"^\s*(?:제\s*)?(\d+(?:\s*\.\s*\d+){0,7})\s*(?:장|절|항)?[.)]?\s+(.*\S)\s*$")
            .unwrap(),
        // Keyword prefix: "Section 1.2 Scope", "Chapter 3) Method"
        Regex::new(
            r"(?i)^\s*(?:section|sec\.|chapter|chap\.|part)\s*(\d+(?:\s*\.\s*\d+){0,7})[.)]?\s+(.*\S)\s*$",
        )
        .unwrap(),
    ]
});

static NUMBER_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\.\s*").unwrap());

/// A paragraph recognized as a numbered heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch {
    /// Dot-separated, spaces removed: "1. 2" becomes "1.2".
    pub number: String,
    pub title: String,
    pub level: u8,
}

pub fn detect_heading(text: &str) -> Option<HeadingMatch> {
    let caps = HEADING_PATTERNS.iter().find_map(|re| re.captures(text))?;
    let number = NUMBER_DOTS.replace_all(caps[1].trim(), ".").into_owned();
    let level = number.split('.').count().min(u8::MAX as usize) as u8;
    Some(HeadingMatch {
        title: normalize_whitespace(&caps[2]),
        number,
        level,
    })
}

struct Node {
    section: Section,
    children: Vec<usize>,
}

/// Build the section forest.
///
/// `last_doc_index` is the last body position; sections still open at the
/// end of the stream close at `last_doc_index + 1`.
pub fn build_sections(
    paragraphs: &[SanitizedParagraph],
    last_doc_index: Option<usize>,
) -> Vec<Section> {
    let mut ordered: Vec<&SanitizedParagraph> = paragraphs.iter().collect();
    ordered.sort_by_key(|p| p.doc_index);

    let mut arena: Vec<Node> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut used_ids: HashSet<String> = HashSet::new();

    for para in ordered {
        let Some(heading) = detect_heading(&para.text) else {
            continue;
        };
        let doc_index = para.doc_index;

        while let Some(&top) = stack.last() {
            if arena[top].section.level < heading.level {
                break;
            }
            arena[top].section.span[1] = doc_index;
            stack.pop();
        }

        let mut id = format!("sec_{}", heading.number);
        if !used_ids.insert(id.clone()) {
            id = format!("sec_{}_{}", heading.number, doc_index);
            used_ids.insert(id.clone());
        }

        let label = normalize_whitespace(&format!("{} {}", heading.number, heading.title));
        let mut path = stack
            .last()
            .map(|&parent| arena[parent].section.path.clone())
            .unwrap_or_default();
        path.push(label);

        debug!(
            "heading at {doc_index}: {} {} (level {})",
            heading.number, heading.title, heading.level
        );

        let node = arena.len();
        arena.push(Node {
            section: Section {
                id,
                number: heading.number,
                title: heading.title,
                level: heading.level,
                doc_index,
                span: [doc_index, doc_index + 1],
                path,
                block_ids: Vec::new(),
                subsections: Vec::new(),
            },
            children: Vec::new(),
        });
        match stack.last() {
            Some(&parent) => arena[parent].children.push(node),
            None => roots.push(node),
        }
        stack.push(node);
    }

    for &open in &stack {
        let start = arena[open].section.span[0];
        let end = last_doc_index.map_or(start, |last| last.max(start)) + 1;
        arena[open].section.span[1] = end;
    }

    let mut slots: Vec<Option<Node>> = arena.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|root| materialize(&mut slots, root))
        .collect()
}

fn materialize(slots: &mut [Option<Node>], index: usize) -> Option<Section> {
    let Node {
        mut section,
        children,
    } = slots.get_mut(index)?.take()?;
    section.subsections = children
        .into_iter()
        .filter_map(|child| materialize(slots, child))
        .collect();
    Some(section)
}
