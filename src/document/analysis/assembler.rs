//! Block assembly and section assignment

use log::info;
use std::collections::BTreeSet;

use crate::document::cleanup::normalize_whitespace;
use crate::document::models::{
    BlockContent, ContentBlock, DocumentDocJson, DocumentMetadata, ParagraphData, Section,
};
use crate::document::records::SanitizedParagraph;

/// Plain paragraph blocks for every paragraph not absorbed by a list and
/// not used as a section heading.
pub fn build_paragraph_blocks(
    paragraphs: &[SanitizedParagraph],
    consumed: &BTreeSet<usize>,
    headings: &BTreeSet<usize>,
) -> Vec<ContentBlock> {
    paragraphs
        .iter()
        .filter(|p| !consumed.contains(&p.doc_index) && !headings.contains(&p.doc_index))
        .filter_map(|p| {
            let text = normalize_whitespace(&p.text);
            (!text.is_empty()).then(|| ContentBlock {
                id: format!("p{}", p.doc_index),
                doc_index: p.doc_index,
                content: BlockContent::Paragraph {
                    paragraph: ParagraphData {
                        text,
                        style: p.style.clone(),
                        runs: p.runs.clone(),
                    },
                },
            })
        })
        .collect()
}

/// Concatenate block groups into one sequence ordered by `(doc_index, id)`.
pub fn merge_blocks<I>(groups: I) -> Vec<ContentBlock>
where
    I: IntoIterator<Item = Vec<ContentBlock>>,
{
    let mut blocks: Vec<ContentBlock> = groups.into_iter().flatten().collect();
    blocks.sort_by(|a, b| a.doc_index.cmp(&b.doc_index).then_with(|| a.id.cmp(&b.id)));
    blocks
}

/// Give each block to the deepest section whose span contains it. Blocks
/// before the first heading stay unassigned.
pub fn assign_blocks_to_sections(sections: &mut [Section], blocks: &[ContentBlock]) {
    let all: Vec<&ContentBlock> = blocks.iter().collect();
    for section in sections.iter_mut() {
        assign(section, &all);
    }
}

fn assign(section: &mut Section, candidates: &[&ContentBlock]) {
    let mut mine: Vec<&ContentBlock> = candidates
        .iter()
        .copied()
        .filter(|b| section.contains(b.doc_index))
        .collect();

    for child in section.subsections.iter_mut() {
        assign(child, &mine);
        mine.retain(|b| !child.contains(b.doc_index));
    }

    mine.sort_by_key(|b| b.doc_index);
    section.block_ids = mine.into_iter().map(|b| b.id.clone()).collect();
}

/// Build the final document from its parts.
pub fn assemble(
    version: &str,
    metadata: DocumentMetadata,
    mut sections: Vec<Section>,
    blocks: Vec<ContentBlock>,
) -> DocumentDocJson {
    assign_blocks_to_sections(&mut sections, &blocks);
    info!(
        "assembled {} blocks into {} top-level sections",
        blocks.len(),
        sections.len()
    );
    DocumentDocJson {
        version: version.to_string(),
        metadata,
        blocks,
        sections,
    }
}
