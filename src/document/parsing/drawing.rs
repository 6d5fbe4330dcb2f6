//! Drawing and shape extraction
//!
//! Collects one [`RawDrawing`] per `w:drawing` (DrawingML) or `w:pict`
//! (legacy VML) element found in a body paragraph.

use log::warn;
use quick_xml::events::BytesStart;

use super::xml::{attr, local, parent};
use crate::document::records::*;

const EMU_PER_PT: f64 = 12_700.0;
const EMU_PER_INCH: f64 = 914_400.0;
const EMU_PER_CM: f64 = 360_000.0;
const EMU_PER_MM: f64 = 36_000.0;
const EMU_PER_PX: f64 = 9_525.0;

/// Rotation in `a:xfrm` is stored in 60000ths of a degree.
const ROTATION_UNITS: f64 = 60_000.0;

const SHAPE_ROOTS: &[&str] = &["wps:wsp", "a:sp", "wps:cxnSp", "a:cxnSp"];
const GROUP_ROOTS: &[&str] = &["wpg:wgp", "wpg:grpSp", "a:grpSp", "v:group"];
const VML_SHAPES: &[&str] = &[
    "v:shape",
    "v:rect",
    "v:roundrect",
    "v:oval",
    "v:line",
    "v:polyline",
];
const WRAP_MODES: &[&str] = &[
    "wp:wrapNone",
    "wp:wrapSquare",
    "wp:wrapThrough",
    "wp:wrapTopAndBottom",
    "wp:wrapTight",
];

pub(crate) struct DrawingState {
    record: RawDrawing,
    /// Ancestor count of the `w:drawing` / `w:pict` element.
    pub(crate) depth: usize,
    shape_depth: Option<usize>,
    shape_done: bool,
    xfrm_depth: Option<usize>,
    simple_pos_enabled: bool,
}

impl DrawingState {
    pub(crate) fn new(
        id: String,
        doc_index: usize,
        placement: Placement,
        depth: usize,
        page: u32,
    ) -> Self {
        Self {
            record: RawDrawing {
                id,
                doc_index,
                kind: None,
                preset: None,
                shape_ref: None,
                text_runs: Vec::new(),
                shape_text_runs: Vec::new(),
                anchor: Anchor::new(placement),
                transform: None,
                start_connection: None,
                end_connection: None,
                page_hint: Some(page),
                malformed_geometry: false,
            },
            depth,
            shape_depth: None,
            shape_done: false,
            xfrm_depth: None,
            simple_pos_enabled: false,
        }
    }

    pub(crate) fn finish(self) -> RawDrawing {
        self.record
    }

    pub(crate) fn open(&mut self, name: &str, e: &BytesStart<'_>, stack: &[String]) {
        let depth = stack.len();
        let parent = parent(stack);

        match name {
            "wp:anchor" => {
                self.record.anchor.placement = Placement::Anchor;
                self.record.anchor.z_order = self.int_attr(e, "relativeHeight");
                self.simple_pos_enabled =
                    matches!(attr(e, "simplePos").as_deref(), Some("1" | "true"));
            }
            "wp:inline" => self.record.anchor.placement = Placement::Inline,
            "wp:simplePos" if self.simple_pos_enabled => {
                self.record.anchor.simple_pos = self.point_attrs(e, "x", "y");
            }
            "wp:positionH" => self.record.anchor.relative_from_h = attr(e, "relativeFrom"),
            "wp:positionV" => self.record.anchor.relative_from_v = attr(e, "relativeFrom"),
            "wp:extent" if matches!(parent, "wp:anchor" | "wp:inline") => {
                self.record.anchor.extent = self.extent_attrs(e);
            }
            n if WRAP_MODES.contains(&n) => {
                self.record.anchor.wrap = Some(local(n).to_string());
            }
            "wp:docPr" if self.record.shape_ref.is_none() => {
                self.record.shape_ref = attr(e, "id");
            }
            n if GROUP_ROOTS.contains(&n) && self.record.kind.is_none() => {
                self.record.kind = Some(DrawingKind::Group);
            }
            n if SHAPE_ROOTS.contains(&n) && self.shape_depth.is_none() && !self.shape_done => {
                self.shape_depth = Some(depth);
                if self.record.kind.is_none() {
                    self.record.kind = Some(if n.ends_with("cxnSp") {
                        DrawingKind::Connector
                    } else {
                        DrawingKind::Shape
                    });
                }
            }
            // A wps:wsp carrying connector properties is a connector line.
            "wps:cNvCnPr" if self.shape_depth.is_some() => {
                if self.record.kind == Some(DrawingKind::Shape) {
                    self.record.kind = Some(DrawingKind::Connector);
                }
            }
            "a:prstGeom" if self.record.preset.is_none() => {
                self.record.preset = attr(e, "prst");
            }
            "a:xfrm" if self.record.transform.is_none() => {
                let rotation = self
                    .int_attr(e, "rot")
                    .map(|r| r as f64 / ROTATION_UNITS)
                    .unwrap_or(0.0);
                self.record.transform = Some(Transform {
                    offset: None,
                    extent: None,
                    rotation,
                });
                self.xfrm_depth = Some(depth);
            }
            "a:off" if self.xfrm_depth == Some(depth.wrapping_sub(1)) => {
                let offset = self.point_attrs(e, "x", "y");
                if let Some(t) = self.record.transform.as_mut() {
                    t.offset = offset;
                }
            }
            "a:ext" if self.xfrm_depth == Some(depth.wrapping_sub(1)) => {
                let extent = self.extent_attrs(e);
                if let Some(t) = self.record.transform.as_mut() {
                    t.extent = extent;
                }
            }
            "a:stCxn" => self.record.start_connection = attr(e, "id"),
            "a:endCxn" => self.record.end_connection = attr(e, "id"),
            n if VML_SHAPES.contains(&n) && self.shape_depth.is_none() && !self.shape_done => {
                self.open_vml_shape(n, e, depth);
            }
            _ => {}
        }
    }

    pub(crate) fn close(&mut self, stack: &[String]) {
        let depth = stack.len();
        if self.shape_depth == Some(depth) {
            self.shape_depth = None;
            self.shape_done = true;
        }
        if self.xfrm_depth == Some(depth) {
            self.xfrm_depth = None;
        }
    }

    pub(crate) fn text(&mut self, text: &str, stack: &[String]) {
        let current = parent(stack);
        match current {
            "wp:posOffset" => {
                let axis = stack
                    .len()
                    .checked_sub(2)
                    .and_then(|i| stack.get(i))
                    .map(String::as_str);
                match text.trim().parse::<i64>() {
                    Ok(v) => {
                        let offset = self.record.anchor.offset.get_or_insert_with(Point::default);
                        match axis {
                            Some("wp:positionH") => offset.x = v as f64,
                            Some("wp:positionV") => offset.y = v as f64,
                            _ => {}
                        }
                    }
                    Err(_) => self.mark_malformed("posOffset", text),
                }
            }
            "a:t" | "w:t" if !text.is_empty() => {
                self.record.text_runs.push(text.to_string());
                if self.shape_depth.is_some() {
                    self.record.shape_text_runs.push(text.to_string());
                }
            }
            _ => {}
        }
    }

    fn open_vml_shape(&mut self, name: &str, e: &BytesStart<'_>, depth: usize) {
        self.shape_depth = Some(depth);
        self.record.anchor.placement = Placement::Vml;

        let is_connector = name == "v:line" || attr(e, "o:connectortype").is_some();
        if self.record.kind.is_none() {
            self.record.kind = Some(if is_connector {
                DrawingKind::Connector
            } else {
                DrawingKind::Shape
            });
        }
        if self.record.preset.is_none() {
            self.record.preset = Some(if is_connector {
                "connector".to_string()
            } else {
                local(name).to_string()
            });
        }
        if self.record.shape_ref.is_none() {
            self.record.shape_ref = attr(e, "id");
        }

        if let Some(style) = attr(e, "style") {
            match parse_vml_style(&style) {
                Some(geometry) => {
                    self.record.anchor.offset = Some(geometry.offset);
                    self.record.anchor.extent = Some(geometry.extent);
                    if geometry.rotation != 0.0 {
                        self.record.transform = Some(Transform {
                            offset: None,
                            extent: None,
                            rotation: geometry.rotation,
                        });
                    }
                }
                None => self.mark_malformed("style", &style),
            }
        }
    }

    fn int_attr(&mut self, e: &BytesStart<'_>, key: &str) -> Option<i64> {
        let raw = attr(e, key)?;
        match raw.trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.mark_malformed(key, &raw);
                None
            }
        }
    }

    fn point_attrs(&mut self, e: &BytesStart<'_>, x: &str, y: &str) -> Option<Point> {
        let x = self.int_attr(e, x)?;
        let y = self.int_attr(e, y)?;
        Some(Point {
            x: x as f64,
            y: y as f64,
        })
    }

    fn extent_attrs(&mut self, e: &BytesStart<'_>) -> Option<Extent> {
        let cx = self.int_attr(e, "cx")?;
        let cy = self.int_attr(e, "cy")?;
        Some(Extent {
            cx: cx as f64,
            cy: cy as f64,
        })
    }

    fn mark_malformed(&mut self, what: &str, value: &str) {
        warn!(
            "drawing {}: unparsable {} value {:?}, geometry will be zeroed",
            self.record.id, what, value
        );
        self.record.malformed_geometry = true;
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct VmlGeometry {
    pub(crate) offset: Point,
    pub(crate) extent: Extent,
    pub(crate) rotation: f64,
}

/// Parse position and size from a VML `style` attribute into EMU.
/// Returns `None` when any geometry value is unparsable.
pub(crate) fn parse_vml_style(style: &str) -> Option<VmlGeometry> {
    let mut geometry = VmlGeometry {
        offset: Point::default(),
        extent: Extent::default(),
        rotation: 0.0,
    };

    for declaration in style.split(';') {
        let Some((key, value)) = declaration.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "margin-left" | "left" => geometry.offset.x = css_length_emu(value)?,
            "margin-top" | "top" => geometry.offset.y = css_length_emu(value)?,
            "width" => geometry.extent.cx = css_length_emu(value)?,
            "height" => geometry.extent.cy = css_length_emu(value)?,
            "rotation" => {
                geometry.rotation = value.trim_end_matches("fd").trim().parse().ok()?;
            }
            _ => {}
        }
    }

    Some(geometry)
}

fn css_length_emu(value: &str) -> Option<f64> {
    let value = value.trim();
    let units: [(&str, f64); 5] = [
        ("pt", EMU_PER_PT),
        ("in", EMU_PER_INCH),
        ("cm", EMU_PER_CM),
        ("mm", EMU_PER_MM),
        ("px", EMU_PER_PX),
    ];
    for (suffix, factor) in units {
        if let Some(number) = value.strip_suffix(suffix) {
            return number.trim().parse::<f64>().ok().map(|n| n * factor);
        }
    }
    value.parse::<f64>().ok().map(|n| n * EMU_PER_PX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vml_style_points() {
        let geometry =
            parse_vml_style("position:absolute;margin-left:10pt;margin-top:20pt;width:100pt;height:50pt")
                .unwrap();
        assert_eq!(geometry.offset, Point { x: 127_000.0, y: 254_000.0 });
        assert_eq!(geometry.extent, Extent { cx: 1_270_000.0, cy: 635_000.0 });
        assert_eq!(geometry.rotation, 0.0);
    }

    #[test]
    fn test_parse_vml_style_units_and_rotation() {
        let geometry = parse_vml_style("left:1in;top:0;width:2cm;height:10mm;rotation:90").unwrap();
        assert_eq!(geometry.offset.x, 914_400.0);
        assert_eq!(geometry.extent.cx, 720_000.0);
        assert_eq!(geometry.extent.cy, 360_000.0);
        assert_eq!(geometry.rotation, 90.0);
    }

    #[test]
    fn test_parse_vml_style_rejects_garbage() {
        assert!(parse_vml_style("width:wide;height:10pt").is_none());
    }
}
