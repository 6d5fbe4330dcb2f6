//! Read-only document queries
//!
//! Section traversal, block lookup by position, text search and outline
//! generation over an assembled document.

use super::models::*;

/// Every section in pre-order (parent before its subsections).
pub fn iter_sections(sections: &[Section]) -> Vec<&Section> {
    let mut out = Vec::new();
    let mut stack: Vec<&Section> = sections.iter().rev().collect();
    while let Some(section) = stack.pop() {
        out.push(section);
        stack.extend(section.subsections.iter().rev());
    }
    out
}

/// The deepest section whose span contains `doc_index`.
pub fn section_at(sections: &[Section], doc_index: usize) -> Option<&Section> {
    let mut current = sections.iter().find(|s| s.contains(doc_index))?;
    while let Some(child) = current.subsections.iter().find(|s| s.contains(doc_index)) {
        current = child;
    }
    Some(current)
}

/// Blocks that start at `doc_index`. Usually one; a paragraph and the
/// diagram anchored in it share an index.
pub fn blocks_at(document: &DocumentDocJson, doc_index: usize) -> Vec<&ContentBlock> {
    document
        .blocks
        .iter()
        .filter(|b| b.doc_index == doc_index)
        .collect()
}

pub fn find_block<'a>(document: &'a DocumentDocJson, id: &str) -> Option<&'a ContentBlock> {
    document.blocks.iter().find(|b| b.id == id)
}

/// Blocks directly assigned to a section, in document order.
pub fn section_blocks<'a>(document: &'a DocumentDocJson, section: &Section) -> Vec<&'a ContentBlock> {
    section
        .block_ids
        .iter()
        .filter_map(|id| find_block(document, id))
        .collect()
}

/// A case-insensitive text hit inside one block.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub block_id: String,
    pub doc_index: usize,
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

pub fn search_document(document: &DocumentDocJson, query: &str) -> Vec<SearchResult> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let query_lower = query.to_lowercase();

    document
        .blocks
        .iter()
        .flat_map(|block| {
            let text = block.text();
            text.lines()
                .filter_map(|line| {
                    let start_pos = line.to_lowercase().find(&query_lower)?;
                    Some(SearchResult {
                        block_id: block.id.clone(),
                        doc_index: block.doc_index,
                        text: line.to_string(),
                        start_pos,
                        end_pos: start_pos + query_lower.len(),
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn generate_outline(document: &DocumentDocJson) -> Vec<OutlineItem> {
    iter_sections(&document.sections)
        .into_iter()
        .map(|section| OutlineItem {
            title: format!("{} {}", section.number, section.title),
            level: section.level,
            doc_index: section.doc_index,
            block_count: section.block_ids.len(),
        })
        .collect()
}
