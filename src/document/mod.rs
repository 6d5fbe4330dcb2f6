//! Document extraction, sanitization and structure analysis
//!
//! This module turns a Microsoft Word (.docx) file into a [`DocumentDocJson`]:
//! a flat, ordered block sequence plus a numbered section tree that refers
//! to blocks by id.

pub mod analysis;
pub(crate) mod cleanup;
pub mod io;
pub mod loader;
pub mod models;
pub mod parsing;
pub mod query;
pub mod records;
pub mod sanitize;

// Re-export all models and query functions
pub use models::*;
pub use query::*;

pub use io::{ArtifactLayout, validate_docx_file};
pub use loader::{
    Extraction, analyze_document, convert_document, convert_document_as, extract_and_sanitize,
    parse_and_sanitize, run_layout,
};
pub use records::SanitizedDocument;
