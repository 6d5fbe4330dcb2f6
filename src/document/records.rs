//! Intermediate records produced by the extraction passes and sanitizers
//!
//! Raw records come straight out of the container or content pass. Sanitized
//! records are what the analyzers consume; they are also persisted so later
//! stages can be re-run from disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::models::FormattedRun;

/// Hint derived from the numbering definition of a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Number,
    Bullet,
}

/// A body paragraph as seen by one extraction pass.
///
/// The sanitized form has the same shape: fields unioned across both passes
/// and runs coalesced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    pub doc_index: usize,
    pub text: String,
    #[serde(default)]
    pub runs: Vec<FormattedRun>,
    pub style: Option<String>,
    pub num_id: Option<u32>,
    pub ilvl: Option<u8>,
    pub num_format: Option<String>,
    pub lvl_text: Option<String>,
    pub list_type: Option<ListKind>,
    pub page_hint: Option<u32>,
}

pub type RawParagraph = ParagraphRecord;
pub type SanitizedParagraph = ParagraphRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VMerge {
    Start,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    pub text: String,
    pub column_span: usize,
    pub v_merge: Option<VMerge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub id: String,
    pub doc_index: usize,
    pub rows: Vec<Vec<RawCell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedTable {
    pub id: String,
    pub doc_index: usize,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<String>>,
    pub preceding_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingKind {
    Shape,
    Connector,
    Group,
}

/// How a drawing is placed in the flow of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Inline,
    Anchor,
    /// Legacy vector markup (`w:pict`).
    Vml,
}

/// Coordinates in EMU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub cx: f64,
    pub cy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub placement: Placement,
    pub relative_from_h: Option<String>,
    pub relative_from_v: Option<String>,
    pub offset: Option<Point>,
    pub simple_pos: Option<Point>,
    pub extent: Option<Extent>,
    pub wrap: Option<String>,
    pub z_order: Option<i64>,
}

impl Anchor {
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            relative_from_h: None,
            relative_from_v: None,
            offset: None,
            simple_pos: None,
            extent: None,
            wrap: None,
            z_order: None,
        }
    }
}

/// Shape transform (`a:xfrm`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub offset: Option<Point>,
    pub extent: Option<Extent>,
    /// Degrees.
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDrawing {
    pub id: String,
    pub doc_index: usize,
    pub kind: Option<DrawingKind>,
    pub preset: Option<String>,
    /// `wp:docPr` id, the target of connector references.
    pub shape_ref: Option<String>,
    /// Every text run anywhere inside the drawing.
    pub text_runs: Vec<String>,
    /// Text runs inside the first shape body only.
    pub shape_text_runs: Vec<String>,
    pub anchor: Anchor,
    pub transform: Option<Transform>,
    pub start_connection: Option<String>,
    pub end_connection: Option<String>,
    pub page_hint: Option<u32>,
    pub malformed_geometry: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedDrawing {
    pub id: String,
    pub doc_index: usize,
    pub kind: DrawingKind,
    pub preset: Option<String>,
    pub shape_ref: Option<String>,
    pub placement: Placement,
    pub position: Point,
    pub extent: Extent,
    pub rotation: f64,
    pub text: String,
    pub circled_numeral: bool,
    pub start_connection: Option<String>,
    pub end_connection: Option<String>,
    pub position_confidence: f64,
    pub page_hint: Option<u32>,
    pub preceding_text: Option<String>,
}

impl SanitizedDrawing {
    pub fn center(&self) -> Point {
        Point {
            x: self.position.x + self.extent.cx / 2.0,
            y: self.position.y + self.extent.cy / 2.0,
        }
    }
}

/// Text of one header or footer part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartText {
    pub part: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineImage {
    pub rel_id: String,
    pub target: String,
    pub content_type: String,
}

/// Number format and level text of one numbering level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFormat {
    pub num_format: String,
    pub lvl_text: Option<String>,
}

/// Resolved numbering: numId -> ilvl -> level format.
pub type NumberingMap = BTreeMap<u32, BTreeMap<u8, LevelFormat>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Output of the container (XML) pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerExtraction {
    pub paragraphs: Vec<RawParagraph>,
    pub tables: Vec<RawTable>,
    pub drawings: Vec<RawDrawing>,
    pub headers: Vec<PartText>,
    pub footers: Vec<PartText>,
    pub relationships: Vec<Relationship>,
    pub numbering: NumberingMap,
    pub page_count: Option<u32>,
    pub core_properties: CoreProperties,
    /// Number of paragraph- and table-level body children, i.e. the next
    /// unused doc_index.
    pub body_len: usize,
}

/// Output of the content (object model) pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentExtraction {
    pub paragraphs: Vec<RawParagraph>,
    pub inline_images: Vec<InlineImage>,
}

/// The merged record every analyzer reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanitizedDocument {
    pub paragraphs: Vec<SanitizedParagraph>,
    pub tables: Vec<SanitizedTable>,
    pub drawings: Vec<SanitizedDrawing>,
    pub headers: Vec<PartText>,
    pub footers: Vec<PartText>,
    pub relationships: Vec<Relationship>,
    pub inline_images: Vec<InlineImage>,
    pub page_count: Option<u32>,
    pub core_properties: CoreProperties,
    pub body_len: usize,
}

impl SanitizedDocument {
    /// Largest doc_index seen in the body, if any.
    pub fn last_doc_index(&self) -> Option<usize> {
        let from_records = self
            .paragraphs
            .iter()
            .map(|p| p.doc_index)
            .chain(self.tables.iter().map(|t| t.doc_index))
            .chain(self.drawings.iter().map(|d| d.doc_index))
            .max();
        match (self.body_len.checked_sub(1), from_records) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_doc_index_prefers_body_len() {
        let mut doc = SanitizedDocument {
            body_len: 31,
            ..Default::default()
        };
        doc.paragraphs.push(ParagraphRecord {
            doc_index: 20,
            text: "x".into(),
            ..Default::default()
        });
        assert_eq!(doc.last_doc_index(), Some(30));

        doc.body_len = 0;
        assert_eq!(doc.last_doc_index(), Some(20));

        let empty = SanitizedDocument::default();
        assert_eq!(empty.last_doc_index(), None);
    }

    #[test]
    fn test_numbering_map_keys_round_trip() {
        let mut map = NumberingMap::new();
        map.entry(3).or_default().insert(
            1,
            LevelFormat {
                num_format: "lowerRoman".into(),
                lvl_text: Some("%2)".into()),
            },
        );
        let json = serde_json::to_string(&map).unwrap();
        let back: NumberingMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_drawing_center() {
        let drawing = SanitizedDrawing {
            id: "d1_0".into(),
            doc_index: 1,
            kind: DrawingKind::Shape,
            preset: None,
            shape_ref: None,
            placement: Placement::Anchor,
            position: Point { x: 100.0, y: 50.0 },
            extent: Extent { cx: 20.0, cy: 10.0 },
            rotation: 0.0,
            text: String::new(),
            circled_numeral: false,
            start_connection: None,
            end_connection: None,
            position_confidence: 1.0,
            page_hint: None,
            preceding_text: None,
        };
        assert_eq!(drawing.center(), Point { x: 110.0, y: 55.0 });
    }
}
