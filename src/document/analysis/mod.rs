//! Analyzers over the sanitized record and the final assembly step

pub mod assembler;
pub mod diagram;
pub mod heading;
pub mod list;
pub mod metadata;

use std::collections::BTreeSet;

use super::models::Section;
use super::query::iter_sections;

pub use assembler::{assemble, assign_blocks_to_sections, build_paragraph_blocks, merge_blocks};
pub use diagram::{build_diagrams, diagram_blocks};
pub use heading::{build_sections, detect_heading};
pub use list::{ListComponents, analyze_lists, analyze_tables};
pub use metadata::{CompiledRules, MetadataRules, analyze_metadata};

/// doc_index of every heading paragraph in the tree.
pub fn heading_indices(sections: &[Section]) -> BTreeSet<usize> {
    iter_sections(sections).iter().map(|s| s.doc_index).collect()
}
