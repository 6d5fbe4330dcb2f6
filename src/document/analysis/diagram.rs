//! Process diagrams from floating shapes
//!
//! Shapes anchored in the same paragraph form one diagram: text shapes are
//! steps, arrow and connector shapes are edges. Diagrams in neighbouring
//! paragraphs are stitched into one when a flow is split across them.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};

use crate::document::models::{
    BlockContent, ConnectorResolution, ContentBlock, DiagramConnector, DiagramData, DiagramType,
    MarkerType, OrderEvidence, ProcessStep,
};
use crate::document::parsing::numbering::{circled_value, roman_value};
use crate::document::records::{DrawingKind, Point, SanitizedDrawing};

const CONFIDENCE_MARKED: f64 = 0.9;
const CONFIDENCE_POSITIONAL: f64 = 0.6;

static ARABIC_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:STEP\s*)?(\d{1,3})\s*[.)\-:>\]]\s*(.+)$").unwrap()
});
static ROMAN_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([ivxlIVXL]{1,6})\s*[.)\-:>\]]\s*(.+)$").unwrap());
static ARABIC_SPACE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,3})\s+(.+)$").unwrap());

/// A leading step marker split off a shape's text.
#[derive(Debug, Clone, PartialEq)]
pub struct StepMarker {
    /// 0 when the text carries no marker.
    pub sequence: u32,
    pub title: String,
    pub literal: String,
    pub marker_type: MarkerType,
}

pub fn parse_step_marker(text: &str) -> StepMarker {
    let text = text.trim();

    let mut chars = text.chars();
    if let Some((first, value)) = chars.next().and_then(|c| Some((c, circled_value(c)?))) {
        return StepMarker {
            sequence: value,
            title: chars.as_str().trim().to_string(),
            literal: first.to_string(),
            marker_type: MarkerType::CircledNumeral,
        };
    }

    ARABIC_MARKER
        .captures(text)
        .and_then(|c| captured(&c, c[1].parse().ok(), MarkerType::Arabic))
        .or_else(|| {
            ROMAN_MARKER
                .captures(text)
                .and_then(|c| captured(&c, roman_value(&c[1]), MarkerType::Roman))
        })
        .or_else(|| {
            ARABIC_SPACE_MARKER
                .captures(text)
                .and_then(|c| captured(&c, c[1].parse().ok(), MarkerType::Arabic))
        })
        .unwrap_or_else(|| StepMarker {
            sequence: 0,
            title: text.to_string(),
            literal: String::new(),
            marker_type: MarkerType::None,
        })
}

fn captured(caps: &Captures, sequence: Option<u32>, marker_type: MarkerType) -> Option<StepMarker> {
    Some(StepMarker {
        sequence: sequence?,
        title: caps[2].trim().to_string(),
        literal: caps[1].to_string(),
        marker_type,
    })
}

fn is_connector(shape: &SanitizedDrawing) -> bool {
    shape.kind == DrawingKind::Connector
}

/// Text-bearing shapes and groups; a group's text comes from its first shape.
fn is_step_candidate(shape: &SanitizedDrawing) -> bool {
    !is_connector(shape) && !shape.text.is_empty()
}

struct Candidate<'a> {
    shape: &'a SanitizedDrawing,
    marker: StepMarker,
}

/// Build one diagram per paragraph that anchors at least one text shape,
/// then stitch diagrams of consecutive paragraphs.
pub fn build_diagrams(drawings: &[SanitizedDrawing]) -> Vec<DiagramData> {
    let mut by_paragraph: BTreeMap<usize, Vec<&SanitizedDrawing>> = BTreeMap::new();
    for drawing in drawings {
        by_paragraph.entry(drawing.doc_index).or_default().push(drawing);
    }

    let parts: Vec<DiagramData> = by_paragraph
        .into_iter()
        .filter_map(|(doc_index, shapes)| build_for_paragraph(doc_index, &shapes))
        .collect();

    stitch(parts)
}

/// Wrap built diagrams as content blocks.
pub fn diagram_blocks(diagrams: Vec<DiagramData>) -> Vec<ContentBlock> {
    diagrams
        .into_iter()
        .map(|diagram| ContentBlock {
            id: diagram.id.clone(),
            doc_index: diagram.doc_index,
            content: BlockContent::Diagram { diagram },
        })
        .collect()
}

fn build_for_paragraph(doc_index: usize, shapes: &[&SanitizedDrawing]) -> Option<DiagramData> {
    let mut candidates: Vec<Candidate> = shapes
        .iter()
        .copied()
        .filter(|s| is_step_candidate(s))
        .map(|shape| Candidate {
            marker: parse_step_marker(&shape.text),
            shape,
        })
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let any_marked = candidates.iter().any(|c| c.marker.sequence > 0);
    let any_unmarked = candidates.iter().any(|c| c.marker.sequence == 0);
    if any_marked {
        // Unmarked steps go last.
        candidates.sort_by(|a, b| {
            let key = |c: &Candidate| match c.marker.sequence {
                0 => u32::MAX,
                n => n,
            };
            key(a)
                .cmp(&key(b))
                .then_with(|| a.marker.title.cmp(&b.marker.title))
        });
    } else {
        candidates.sort_by(|a, b| {
            let sum = |c: &Candidate| {
                let center = c.shape.center();
                center.x + center.y
            };
            sum(a)
                .total_cmp(&sum(b))
                .then_with(|| a.shape.id.cmp(&b.shape.id))
        });
    }

    let steps: Vec<ProcessStep> = candidates
        .iter()
        .zip(1u32..)
        .map(|(c, sequence)| ProcessStep {
            sequence,
            title: c.marker.title.clone(),
            marker: c.marker.literal.clone(),
            marker_type: c.marker.marker_type,
            confidence: if c.marker.sequence > 0 {
                CONFIDENCE_MARKED
            } else {
                CONFIDENCE_POSITIONAL
            },
            shape_ids: vec![c.shape.id.clone()],
            doc_index,
        })
        .collect();

    let centers: Vec<(u32, Point)> = candidates
        .iter()
        .zip(&steps)
        .map(|(c, step)| (step.sequence, c.shape.center()))
        .collect();
    let by_ref: HashMap<&str, u32> = candidates
        .iter()
        .zip(&steps)
        .filter_map(|(c, step)| Some((c.shape.shape_ref.as_deref()?, step.sequence)))
        .collect();

    let connectors = shapes
        .iter()
        .filter(|s| is_connector(s))
        .map(|shape| resolve_connector(shape, &centers, &by_ref))
        .collect();

    let mut order_evidence = Vec::new();
    if any_marked {
        order_evidence.push(OrderEvidence::NumericMarker);
    }
    if any_unmarked {
        order_evidence.push(OrderEvidence::Position);
    }

    Some(DiagramData {
        id: format!("diag_{doc_index}"),
        doc_index,
        diagram_type: classify(steps.len()),
        steps,
        connectors,
        doc_indices: vec![doc_index],
        page_hint: majority_page(shapes),
        order_evidence,
    })
}

fn classify(step_count: usize) -> DiagramType {
    if step_count >= 2 {
        DiagramType::Sequential
    } else {
        DiagramType::Unknown
    }
}

fn resolve_connector(
    shape: &SanitizedDrawing,
    centers: &[(u32, Point)],
    by_ref: &HashMap<&str, u32>,
) -> DiagramConnector {
    let explicit = (|| {
        let from = *by_ref.get(shape.start_connection.as_deref()?)?;
        let to = *by_ref.get(shape.end_connection.as_deref()?)?;
        Some((from, to))
    })();
    if let Some((from, to)) = explicit {
        debug!("connector {}: explicit {from} -> {to}", shape.id);
        return DiagramConnector {
            id: shape.id.clone(),
            from_step: Some(from),
            to_step: Some(to),
            resolution: ConnectorResolution::Explicit,
        };
    }

    let Some((from, to)) = nearest_pair(shape.center(), centers) else {
        return DiagramConnector {
            id: shape.id.clone(),
            from_step: None,
            to_step: None,
            resolution: ConnectorResolution::Unresolved,
        };
    };
    debug!("connector {}: nearest {from} -> {to}", shape.id);
    DiagramConnector {
        id: shape.id.clone(),
        from_step: Some(from),
        to_step: Some(to),
        resolution: ConnectorResolution::Nearest,
    }
}

/// The two steps closest to `point`, ordered left-to-right or top-to-bottom.
fn nearest_pair(point: Point, centers: &[(u32, Point)]) -> Option<(u32, u32)> {
    if centers.len() < 2 {
        return None;
    }
    let mut by_distance: Vec<(f64, u32, Point)> = centers
        .iter()
        .map(|&(sequence, c)| ((c.x - point.x).hypot(c.y - point.y), sequence, c))
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let (_, a, pa) = by_distance[0];
    let (_, b, pb) = by_distance[1];
    if pa.x < pb.x || pa.y < pb.y {
        Some((a, b))
    } else {
        Some((b, a))
    }
}

fn majority_page(shapes: &[&SanitizedDrawing]) -> Option<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for page in shapes.iter().filter_map(|s| s.page_hint) {
        *counts.entry(page).or_default() += 1;
    }
    // Ties go to the earliest page.
    counts
        .into_iter()
        .fold(None, |best: Option<(u32, usize)>, (page, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((page, n)),
        })
        .map(|(page, _)| page)
}

/// Merge diagrams whose paragraphs are consecutive (n, n+1, ...).
pub fn stitch(mut parts: Vec<DiagramData>) -> Vec<DiagramData> {
    parts.sort_by_key(|d| d.doc_index);
    let mut merged: Vec<DiagramData> = Vec::with_capacity(parts.len());

    for next in parts {
        let adjacent = merged
            .last()
            .is_some_and(|current| last_index(current) + 1 == next.doc_index);
        match merged.last_mut() {
            Some(current) if adjacent => {
                info!(
                    "stitching {} into {} at doc_index {}",
                    next.id, current.id, next.doc_index
                );
                append(current, next);
            }
            _ => merged.push(next),
        }
    }
    merged
}

fn last_index(diagram: &DiagramData) -> usize {
    diagram
        .doc_indices
        .iter()
        .copied()
        .max()
        .unwrap_or(diagram.doc_index)
}

fn append(current: &mut DiagramData, next: DiagramData) {
    let offset = current.steps.iter().map(|s| s.sequence).max().unwrap_or(0);
    let shift = |n: Option<u32>| n.map(|n| n + offset);

    current
        .steps
        .extend(next.steps.into_iter().map(|mut step| {
            step.sequence += offset;
            step
        }));
    current
        .connectors
        .extend(next.connectors.into_iter().map(|mut connector| {
            connector.from_step = shift(connector.from_step);
            connector.to_step = shift(connector.to_step);
            connector
        }));

    current.doc_indices.extend(next.doc_indices);
    current.doc_indices.sort_unstable();
    current.doc_indices.dedup();

    current.order_evidence.extend(next.order_evidence);
    current.order_evidence.sort();
    current.order_evidence.dedup();

    current.page_hint = current.page_hint.or(next.page_hint);
    current.diagram_type = classify(current.steps.len());
}
