//! Shape normalization
//!
//! Turns raw drawing records into flat shapes with one position, one extent
//! and a confidence score for how much that position can be trusted.

use crate::document::cleanup::normalize_whitespace;
use crate::document::parsing::numbering::circled_value;
use crate::document::records::{
    DrawingKind, Extent, Placement, Point, RawDrawing, SanitizedDrawing,
};

const PAGE_RELATIVE: &[&str] = &[
    "page",
    "margin",
    "leftMargin",
    "rightMargin",
    "topMargin",
    "bottomMargin",
    "insideMargin",
    "outsideMargin",
];
const FLOW_RELATIVE: &[&str] = &["column", "paragraph", "character", "line"];

const CONFIDENCE_PAGE: f64 = 1.0;
const CONFIDENCE_VML: f64 = 0.8;
const CONFIDENCE_FLOW: f64 = 0.6;
const CONFIDENCE_UNKNOWN: f64 = 0.5;
const CONFIDENCE_INLINE: f64 = 0.0;

pub fn sanitize_drawing(raw: &RawDrawing, preceding_text: Option<String>) -> SanitizedDrawing {
    let text = drawing_text(raw);
    let circled_numeral = text.chars().next().and_then(circled_value).is_some();

    let (position, extent, rotation) = if raw.malformed_geometry {
        (Point::default(), Extent::default(), 0.0)
    } else {
        geometry(raw)
    };

    SanitizedDrawing {
        id: raw.id.clone(),
        doc_index: raw.doc_index,
        kind: classify_kind(raw),
        preset: raw.preset.clone(),
        shape_ref: raw.shape_ref.clone(),
        placement: raw.anchor.placement,
        position,
        extent,
        rotation,
        text,
        circled_numeral,
        start_connection: raw.start_connection.clone(),
        end_connection: raw.end_connection.clone(),
        position_confidence: position_confidence(raw),
        page_hint: raw.page_hint,
        preceding_text,
    }
}

fn classify_kind(raw: &RawDrawing) -> DrawingKind {
    let preset = raw.preset.as_deref().unwrap_or_default().to_lowercase();
    if preset.contains("arrow") || preset.contains("connector") {
        return DrawingKind::Connector;
    }
    raw.kind.unwrap_or(DrawingKind::Shape)
}

/// Drawing-level runs win; the first shape's runs fill in when those are empty.
fn drawing_text(raw: &RawDrawing) -> String {
    let runs = if raw.text_runs.iter().any(|t| !t.trim().is_empty()) {
        &raw.text_runs
    } else {
        &raw.shape_text_runs
    };
    let joined = runs.join(" ").replace(['\u{200B}', '\u{FEFF}'], "");
    normalize_whitespace(&joined)
}

fn geometry(raw: &RawDrawing) -> (Point, Extent, f64) {
    let transform = raw.transform.unwrap_or_default();
    let position = match raw.anchor.placement {
        Placement::Inline => transform.offset.unwrap_or_default(),
        Placement::Anchor => raw
            .anchor
            .offset
            .or(raw.anchor.simple_pos)
            .or(transform.offset)
            .unwrap_or_default(),
        Placement::Vml => transform.offset.unwrap_or_default(),
    };
    let extent = raw
        .anchor
        .extent
        .or(transform.extent)
        .unwrap_or_default();
    (position, extent, transform.rotation)
}

pub(crate) fn position_confidence(raw: &RawDrawing) -> f64 {
    if raw.malformed_geometry {
        return CONFIDENCE_UNKNOWN;
    }
    match raw.anchor.placement {
        Placement::Inline => CONFIDENCE_INLINE,
        Placement::Vml => CONFIDENCE_VML,
        Placement::Anchor => {
            let references = [
                raw.anchor.relative_from_h.as_deref(),
                raw.anchor.relative_from_v.as_deref(),
            ];
            let any_in = |set: &[&str]| references.iter().flatten().any(|r| set.contains(r));
            if any_in(PAGE_RELATIVE) {
                CONFIDENCE_PAGE
            } else if any_in(FLOW_RELATIVE) {
                CONFIDENCE_FLOW
            } else {
                CONFIDENCE_UNKNOWN
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::records::{Anchor, Transform};

    fn raw(placement: Placement) -> RawDrawing {
        RawDrawing {
            id: "d3_0".into(),
            doc_index: 3,
            kind: None,
            preset: Some("rect".into()),
            shape_ref: Some("5".into()),
            text_runs: Vec::new(),
            shape_text_runs: Vec::new(),
            anchor: Anchor::new(placement),
            transform: None,
            start_connection: None,
            end_connection: None,
            page_hint: Some(1),
            malformed_geometry: false,
        }
    }

    #[test]
    fn test_kind_defaults_and_arrow_reclassification() {
        let shape = raw(Placement::Anchor);
        assert_eq!(sanitize_drawing(&shape, None).kind, DrawingKind::Shape);

        let mut arrow = raw(Placement::Anchor);
        arrow.preset = Some("rightArrow".into());
        assert_eq!(sanitize_drawing(&arrow, None).kind, DrawingKind::Connector);

        let mut connector = raw(Placement::Anchor);
        connector.preset = Some("straightConnector1".into());
        assert_eq!(
            sanitize_drawing(&connector, None).kind,
            DrawingKind::Connector
        );
    }

    #[test]
    fn test_text_falls_back_to_shape_runs() {
        let mut drawing = raw(Placement::Anchor);
        drawing.shape_text_runs = vec!["②".into(), "  Review\u{00A0}draft ".into()];
        let shape = sanitize_drawing(&drawing, Some("Figure 1".into()));
        assert_eq!(shape.text, "② Review draft");
        assert!(shape.circled_numeral);
        assert_eq!(shape.preceding_text.as_deref(), Some("Figure 1"));

        drawing.text_runs = vec!["Start".into()];
        let shape = sanitize_drawing(&drawing, None);
        assert_eq!(shape.text, "Start");
        assert!(!shape.circled_numeral);
    }

    #[test]
    fn test_position_confidence_by_reference() {
        let mut drawing = raw(Placement::Anchor);
        drawing.anchor.relative_from_h = Some("page".into());
        assert_eq!(position_confidence(&drawing), 1.0);

        drawing.anchor.relative_from_h = Some("column".into());
        drawing.anchor.relative_from_v = Some("paragraph".into());
        assert_eq!(position_confidence(&drawing), 0.6);

        drawing.anchor.relative_from_h = None;
        drawing.anchor.relative_from_v = None;
        assert_eq!(position_confidence(&drawing), 0.5);

        assert_eq!(position_confidence(&raw(Placement::Inline)), 0.0);
        assert_eq!(position_confidence(&raw(Placement::Vml)), 0.8);
    }

    #[test]
    fn test_geometry_prefers_anchor_offset() {
        let mut drawing = raw(Placement::Anchor);
        drawing.anchor.offset = Some(Point { x: 10.0, y: 20.0 });
        drawing.anchor.extent = Some(Extent { cx: 5.0, cy: 6.0 });
        drawing.transform = Some(Transform {
            offset: Some(Point { x: 99.0, y: 99.0 }),
            extent: None,
            rotation: 45.0,
        });
        let shape = sanitize_drawing(&drawing, None);
        assert_eq!(shape.position, Point { x: 10.0, y: 20.0 });
        assert_eq!(shape.extent, Extent { cx: 5.0, cy: 6.0 });
        assert_eq!(shape.rotation, 45.0);
    }

    #[test]
    fn test_malformed_geometry_is_zeroed() {
        let mut drawing = raw(Placement::Anchor);
        drawing.anchor.relative_from_h = Some("page".into());
        drawing.anchor.offset = Some(Point { x: 10.0, y: 20.0 });
        drawing.malformed_geometry = true;
        let shape = sanitize_drawing(&drawing, None);
        assert_eq!(shape.position, Point::default());
        assert_eq!(shape.position_confidence, 0.5);
    }
}
