//! Core data structures for the DocJSON document model
//!
//! This module defines the public types emitted by the pipeline: the root
//! document, its section tree, the typed content blocks and the diagram
//! model, together with the run formatting shared with the raw records.

use serde::{Deserialize, Serialize};

/// Version stamp written into every emitted document.
pub const DOCJSON_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDocJson {
    pub version: String,
    pub metadata: DocumentMetadata,
    pub blocks: Vec<ContentBlock>,
    pub sections: Vec<Section>,
}

/// Document-identifying fields. Unmatched fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_type: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub doc_number: Option<String>,
    pub revision: Option<String>,
    pub effective_date: Option<String>,
    pub author: Option<String>,
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub style: Option<String>,
    pub font_size: Option<f32>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormattedRun {
    pub text: String,
    pub formatting: TextFormatting,
}

impl FormattedRun {
    /// Consolidate adjacent runs with identical formatting into single runs
    pub fn consolidate_runs(runs: Vec<FormattedRun>) -> Vec<FormattedRun> {
        let mut consolidated: Vec<FormattedRun> = Vec::with_capacity(runs.len());

        for run in runs {
            match consolidated.last_mut() {
                Some(current) if current.formatting == run.formatting => {
                    current.text.push_str(&run.text);
                }
                _ => consolidated.push(run),
            }
        }

        consolidated
    }
}

/// One entry of the flat block sequence.
///
/// The variant payload is flattened next to `id`/`doc_index` and tagged with
/// a lowercase `type` field, so exactly one payload key is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: String,
    pub doc_index: usize,
    #[serde(flatten)]
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockContent {
    Paragraph { paragraph: ParagraphData },
    List { list_data: ListData },
    Table { table: TableData },
    Diagram { diagram: DiagramData },
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self.content {
            BlockContent::Paragraph { .. } => "paragraph",
            BlockContent::List { .. } => "list",
            BlockContent::Table { .. } => "table",
            BlockContent::Diagram { .. } => "diagram",
        }
    }

    /// Plain text of the block, used by queries and metadata lookup.
    pub fn text(&self) -> String {
        match &self.content {
            BlockContent::Paragraph { paragraph } => paragraph.text.clone(),
            BlockContent::List { list_data } => list_data.items.join("\n"),
            BlockContent::Table { table } => table
                .data
                .iter()
                .map(|row| row.join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockContent::Diagram { diagram } => diagram
                .steps
                .iter()
                .map(|s| s.title.as_str())
                .collect::<Vec<_>>()
                .join(" -> "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphData {
    pub text: String,
    pub style: Option<String>,
    #[serde(default)]
    pub runs: Vec<FormattedRun>,
}

/// Numbering scheme of a list, derived from the numbering format or the
/// first item's textual marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListScheme {
    Decimal,
    Roman,
    Alpha,
    Ganada,
    ArabicAlpha,
    Hebrew,
    Thai,
    Cjk,
    Kana,
    Bullet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListData {
    pub ordered: bool,
    pub scheme: ListScheme,
    pub level: u8,
    pub num_id: Option<u32>,
    pub items: Vec<String>,
    pub item_doc_indices: Vec<usize>,
}

/// A rectangular table whose merged cells carry their anchor's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub doc_index: usize,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<String>>,
    pub preceding_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    Sequential,
    Parallel,
    Hybrid,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvidence {
    NumericMarker,
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerType {
    CircledNumeral,
    Arabic,
    Roman,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub sequence: u32,
    pub title: String,
    pub marker: String,
    pub marker_type: MarkerType,
    pub confidence: f64,
    pub shape_ids: Vec<String>,
    pub doc_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorResolution {
    /// Endpoints named by the shape's own connection references.
    Explicit,
    /// Endpoints inferred from the two nearest steps.
    Nearest,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramConnector {
    pub id: String,
    pub from_step: Option<u32>,
    pub to_step: Option<u32>,
    pub resolution: ConnectorResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramData {
    pub id: String,
    pub doc_index: usize,
    #[serde(rename = "type")]
    pub diagram_type: DiagramType,
    pub steps: Vec<ProcessStep>,
    pub connectors: Vec<DiagramConnector>,
    pub doc_indices: Vec<usize>,
    pub page_hint: Option<u32>,
    pub order_evidence: Vec<OrderEvidence>,
}

/// A numbered section and the half-open `[start, end)` range of doc_index
/// values it owns. Blocks are referenced by id; the block payloads live in
/// the flat `blocks` sequence of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub number: String,
    pub title: String,
    pub level: u8,
    pub doc_index: usize,
    pub span: [usize; 2],
    pub path: Vec<String>,
    #[serde(default)]
    pub block_ids: Vec<String>,
    #[serde(default)]
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn contains(&self, doc_index: usize) -> bool {
        self.span[0] <= doc_index && doc_index < self.span[1]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineItem {
    pub title: String,
    pub level: u8,
    pub doc_index: usize,
    pub block_count: usize,
}
