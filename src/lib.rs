//! docjson: structure reconstruction for .docx files
//!
//! This library extracts a Word document through two independent passes,
//! sanitizes and merges them, and rebuilds the document's structure
//! (numbered sections, lists, tables, step diagrams and metadata) into a
//! single JSON document model.

pub mod config;
pub mod document;
pub mod error;

/// How far `convert` runs the pipeline
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Extract and sanitize only, writing the `_sanitized` records
    Sanitize,
    /// Run every stage through the final .docjson
    Full,
}

/// Output options for `inspect`
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InspectFormat {
    /// Counts and a section outline
    Summary,
    /// The artifact as pretty-printed JSON
    Json,
}

// Re-export commonly used types
pub use config::Config;
pub use document::{
    ArtifactLayout, DocumentDocJson, SanitizedDocument, convert_document, convert_document_as,
    parse_and_sanitize, run_layout,
};
pub use error::{ExtractError, ExtractStage};
