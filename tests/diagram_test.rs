use docjson::Config;
use docjson::document::analysis::build_diagrams;
use docjson::document::parsing::extract_container;
use docjson::document::records::{DrawingKind, Placement};
use docjson::document::sanitize::sanitize_document;
use docjson::document::{
    BlockContent, ConnectorResolution, DiagramData, DiagramType, MarkerType, OrderEvidence,
    analyze_document, find_block,
};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

const NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape" "#,
    r#"xmlns:wpg="http://schemas.microsoft.com/office/word/2010/wordprocessingGroup""#,
);

fn build_docx(document_xml: &str) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(document_xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// A page-anchored text box at (x, y) with the given size.
fn text_box(id: u32, x: i64, y: i64, cx: i64, cy: i64, text: &str) -> String {
    format!(
        r#"<w:r><w:drawing><wp:anchor relativeHeight="{id}">
             <wp:positionH relativeFrom="page"><wp:posOffset>{x}</wp:posOffset></wp:positionH>
             <wp:positionV relativeFrom="page"><wp:posOffset>{y}</wp:posOffset></wp:positionV>
             <wp:extent cx="{cx}" cy="{cy}"/><wp:wrapNone/><wp:docPr id="{id}" name="Box {id}"/>
             <a:graphic><a:graphicData><wps:wsp><wps:spPr><a:prstGeom prst="rect"/></wps:spPr>
             <wps:txbx><w:txbxContent><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:txbxContent></wps:txbx>
             </wps:wsp></a:graphicData></a:graphic></wp:anchor></w:drawing></w:r>"#
    )
}

/// A page-anchored group wrapping one text box.
fn grouped_box(id: u32, x: i64, y: i64, text: &str) -> String {
    format!(
        r#"<w:r><w:drawing><wp:anchor relativeHeight="{id}">
             <wp:positionH relativeFrom="page"><wp:posOffset>{x}</wp:posOffset></wp:positionH>
             <wp:positionV relativeFrom="page"><wp:posOffset>{y}</wp:posOffset></wp:positionV>
             <wp:extent cx="1000" cy="500"/><wp:wrapNone/><wp:docPr id="{id}" name="Group {id}"/>
             <a:graphic><a:graphicData><wpg:wgp><wpg:grpSpPr/>
             <wps:wsp><wps:spPr><a:prstGeom prst="rect"/></wps:spPr>
             <wps:txbx><w:txbxContent><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:txbxContent></wps:txbx>
             </wps:wsp></wpg:wgp></a:graphicData></a:graphic></wp:anchor></w:drawing></w:r>"#
    )
}

/// A straight connector line with optional explicit endpoints.
fn connector(id: u32, x: i64, y: i64, cx: i64, ends: Option<(u32, u32)>) -> String {
    let cxn = match ends {
        Some((start, end)) => {
            format!(r#"<wps:cNvCnPr><a:stCxn id="{start}"/><a:endCxn id="{end}"/></wps:cNvCnPr>"#)
        }
        None => "<wps:cNvCnPr/>".to_string(),
    };
    format!(
        r#"<w:r><w:drawing><wp:anchor relativeHeight="{id}">
             <wp:positionH relativeFrom="page"><wp:posOffset>{x}</wp:posOffset></wp:positionH>
             <wp:positionV relativeFrom="page"><wp:posOffset>{y}</wp:posOffset></wp:positionV>
             <wp:extent cx="{cx}" cy="10"/><wp:wrapNone/><wp:docPr id="{id}" name="Line {id}"/>
             <a:graphic><a:graphicData><wps:wsp>{cxn}<wps:spPr><a:prstGeom prst="straightConnector1"/></wps:spPr>
             </wps:wsp></a:graphicData></a:graphic></wp:anchor></w:drawing></w:r>"#
    )
}

fn paragraph(runs: &[String]) -> String {
    format!("<w:p>{}</w:p>", runs.concat())
}

fn text(value: &str) -> String {
    format!("<w:p><w:r><w:t>{value}</w:t></w:r></w:p>")
}

fn document(paragraphs: &[String]) -> String {
    format!(
        "<w:document {NAMESPACES}><w:body>{}<w:sectPr/></w:body></w:document>",
        paragraphs.concat()
    )
}

/// ```text
/// 0  1. Workflow
/// 1  ① Draft, ② Review and a connector between them
/// 2  ③ Approve, ④ Publish and a connector between them
/// 3  2. Records
/// 4  Keep records.
/// ```
fn workflow_docx() -> Vec<u8> {
    build_docx(&document(&[
        text("1. Workflow"),
        paragraph(&[
            text_box(11, 0, 0, 1000, 500, "① Draft"),
            connector(12, 1000, 245, 2000, None),
            text_box(13, 3000, 0, 1000, 500, "② Review"),
        ]),
        paragraph(&[
            text_box(21, 0, 2000, 1000, 500, "③ Approve"),
            text_box(22, 3000, 2000, 1000, 500, "④ Publish"),
            connector(23, 1000, 2245, 2000, Some((21, 22))),
        ]),
        text("2. Records"),
        text("Keep records."),
    ]))
}

fn diagrams_of(bytes: &[u8]) -> Vec<DiagramData> {
    let container = extract_container(bytes).unwrap();
    let sanitized = sanitize_document(&container, None);
    build_diagrams(&sanitized.drawings)
}

fn sequences(diagram: &DiagramData) -> Vec<u32> {
    diagram.steps.iter().map(|s| s.sequence).collect()
}

#[cfg(test)]
mod extraction_tests {
    use super::*;

    #[test]
    fn test_shapes_are_attributed_to_their_paragraph() {
        let container = extract_container(&workflow_docx()).unwrap();
        assert_eq!(container.body_len, 5);
        assert_eq!(container.drawings.len(), 6);

        // Text box content does not leak into the anchoring paragraph.
        assert!(container.paragraphs.iter().all(|p| !p.text.contains("Draft")));

        let sanitized = sanitize_document(&container, None);
        let draft = &sanitized.drawings[0];
        assert_eq!(draft.doc_index, 1);
        assert_eq!(draft.kind, DrawingKind::Shape);
        assert_eq!(draft.placement, Placement::Anchor);
        assert_eq!(draft.text, "① Draft");
        assert!(draft.circled_numeral);
        assert_eq!(draft.position_confidence, 1.0);

        let line = &sanitized.drawings[1];
        assert_eq!(line.kind, DrawingKind::Connector);
        assert_eq!(line.preset.as_deref(), Some("straightConnector1"));
    }
}

#[cfg(test)]
mod diagram_tests {
    use super::*;

    #[test]
    fn test_consecutive_paragraphs_are_stitched() {
        let diagrams = diagrams_of(&workflow_docx());
        assert_eq!(diagrams.len(), 1);

        let diagram = &diagrams[0];
        assert_eq!(diagram.id, "diag_1");
        assert_eq!(diagram.diagram_type, DiagramType::Sequential);
        assert_eq!(diagram.doc_indices, vec![1, 2]);
        assert_eq!(sequences(diagram), vec![1, 2, 3, 4]);

        let titles: Vec<&str> = diagram.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Draft", "Review", "Approve", "Publish"]);
        assert!(
            diagram
                .steps
                .iter()
                .all(|s| s.marker_type == MarkerType::CircledNumeral)
        );
        assert_eq!(diagram.order_evidence, vec![OrderEvidence::NumericMarker]);
        assert_eq!(diagram.page_hint, Some(1));
    }

    #[test]
    fn test_connectors_resolved_and_shifted() {
        let diagrams = diagrams_of(&workflow_docx());
        let connectors = &diagrams[0].connectors;
        assert_eq!(connectors.len(), 2);

        let nearest = &connectors[0];
        assert_eq!(nearest.resolution, ConnectorResolution::Nearest);
        assert_eq!((nearest.from_step, nearest.to_step), (Some(1), Some(2)));

        // Explicit endpoints of the second paragraph, offset past the first.
        let explicit = &connectors[1];
        assert_eq!(explicit.resolution, ConnectorResolution::Explicit);
        assert_eq!((explicit.from_step, explicit.to_step), (Some(3), Some(4)));
    }

    #[test]
    fn test_unmarked_boxes_ordered_by_position() {
        let bytes = build_docx(&document(&[paragraph(&[
            text_box(3, 4000, 0, 1000, 500, "Ship"),
            text_box(1, 0, 0, 1000, 500, "Order"),
            text_box(2, 2000, 0, 1000, 500, "Pack"),
        ])]));
        let diagrams = diagrams_of(&bytes);
        assert_eq!(diagrams.len(), 1);

        let diagram = &diagrams[0];
        let titles: Vec<&str> = diagram.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Order", "Pack", "Ship"]);
        assert_eq!(sequences(diagram), vec![1, 2, 3]);
        assert_eq!(diagram.order_evidence, vec![OrderEvidence::Position]);
        assert!(diagram.steps.iter().all(|s| s.marker_type == MarkerType::None));
    }

    #[test]
    fn test_grouped_shapes_become_steps() {
        let bytes = build_docx(&document(&[paragraph(&[
            grouped_box(31, 0, 0, "① Grouped box"),
            text_box(32, 2000, 0, 1000, 500, "② Loose box"),
        ])]));

        let container = extract_container(&bytes).unwrap();
        let sanitized = sanitize_document(&container, None);
        assert_eq!(sanitized.drawings[0].kind, DrawingKind::Group);
        assert_eq!(sanitized.drawings[0].text, "① Grouped box");

        let diagrams = build_diagrams(&sanitized.drawings);
        assert_eq!(diagrams.len(), 1);
        let titles: Vec<&str> = diagrams[0].steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Grouped box", "Loose box"]);
        assert_eq!(diagrams[0].diagram_type, DiagramType::Sequential);
    }

    #[test]
    fn test_gap_between_paragraphs_keeps_diagrams_apart() {
        let bytes = build_docx(&document(&[
            paragraph(&[
                text_box(1, 0, 0, 1000, 500, "1. Plan"),
                text_box(2, 2000, 0, 1000, 500, "2. Build"),
            ]),
            text("Interlude"),
            paragraph(&[text_box(3, 0, 0, 1000, 500, "1. Test")]),
        ]));
        let diagrams = diagrams_of(&bytes);
        assert_eq!(diagrams.len(), 2);
        assert_eq!(diagrams[0].doc_indices, vec![0]);
        assert_eq!(diagrams[1].id, "diag_2");
        assert_eq!(diagrams[1].diagram_type, DiagramType::Unknown);
    }
}

#[cfg(test)]
mod assembly_tests {
    use super::*;

    #[test]
    fn test_diagram_block_lands_in_its_section() {
        let container = extract_container(&workflow_docx()).unwrap();
        let sanitized = sanitize_document(&container, None);
        let doc = analyze_document(&sanitized, &Config::default()).unwrap();

        let ids: Vec<&str> = doc.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["diag_1", "p4"]);

        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].span, [0, 3]);
        assert_eq!(doc.sections[0].block_ids, vec!["diag_1"]);
        assert_eq!(doc.sections[1].block_ids, vec!["p4"]);

        let block = find_block(&doc, "diag_1").expect("diagram block");
        let BlockContent::Diagram { diagram } = &block.content else {
            panic!("expected a diagram, got {}", block.kind());
        };
        assert_eq!(diagram.steps.len(), 4);
    }
}
