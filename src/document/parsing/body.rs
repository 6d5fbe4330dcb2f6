//! Body traversal for `word/document.xml`
//!
//! One left-to-right pass over the body. Every direct `w:p` or `w:tbl`
//! child of `w:body` takes the next doc_index; the final counter value is
//! returned as `body_len`.

use log::debug;
use quick_xml::events::BytesStart;

use super::drawing::DrawingState;
use super::numbering::list_kind_for_format;
use super::xml::{XmlVisitor, attr, on_off, parent, walk};
use crate::document::models::{FormattedRun, TextFormatting};
use crate::document::records::*;
use crate::error::Result;

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Default)]
pub(crate) struct BodyRecords {
    pub(crate) paragraphs: Vec<RawParagraph>,
    pub(crate) tables: Vec<RawTable>,
    pub(crate) drawings: Vec<RawDrawing>,
    pub(crate) body_len: usize,
}

/// Parse the document body into raw paragraph, table and drawing records.
pub(crate) fn parse_body(xml: &[u8], numbering: &NumberingMap) -> Result<BodyRecords> {
    let mut walker = BodyWalker::new(numbering, contains(xml, b"lastRenderedPageBreak"));
    walk(xml, DOCUMENT_PART, &mut walker)?;
    debug!(
        "body: {} paragraphs, {} tables, {} drawings over {} blocks",
        walker.out.paragraphs.len(),
        walker.out.tables.len(),
        walker.out.drawings.len(),
        walker.next_index
    );
    walker.out.body_len = walker.next_index;
    Ok(walker.out)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[derive(Default)]
struct RunState {
    formatting: TextFormatting,
    text: String,
}

struct ParagraphState {
    doc_index: usize,
    page: u32,
    style: Option<String>,
    num_id: Option<u32>,
    ilvl: Option<u8>,
    runs: Vec<FormattedRun>,
    run: Option<RunState>,
    drawing_count: usize,
}

struct CellState {
    paragraphs: Vec<String>,
    current: String,
    column_span: usize,
    v_merge: Option<VMerge>,
}

struct TableState {
    doc_index: usize,
    depth: usize,
    rows: Vec<Vec<RawCell>>,
    row: Option<Vec<RawCell>>,
    cell: Option<CellState>,
}

enum Block {
    Paragraph(ParagraphState),
    Table(TableState),
}

struct BodyWalker<'a> {
    numbering: &'a NumberingMap,
    rendered_breaks: bool,
    next_index: usize,
    page: u32,
    block: Option<Block>,
    drawing: Option<DrawingState>,
    skip_depth: Option<usize>,
    out: BodyRecords,
}

impl<'a> BodyWalker<'a> {
    fn new(numbering: &'a NumberingMap, rendered_breaks: bool) -> Self {
        Self {
            numbering,
            rendered_breaks,
            next_index: 0,
            page: 1,
            block: None,
            drawing: None,
            skip_depth: None,
            out: BodyRecords::default(),
        }
    }

    fn take_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Page counting prefers the renderer's own breaks when the file has them.
    fn track_page(&mut self, name: &str, e: &BytesStart<'_>, stack: &[String]) {
        let advance = match name {
            "w:lastRenderedPageBreak" => self.rendered_breaks,
            "w:br" => !self.rendered_breaks && attr(e, "w:type").as_deref() == Some("page"),
            "w:pageBreakBefore" => {
                !self.rendered_breaks && parent(stack) == "w:pPr" && on_off(e)
            }
            _ => false,
        };
        if advance {
            self.page += 1;
            if name == "w:pageBreakBefore" {
                if let Some(Block::Paragraph(p)) = self.block.as_mut() {
                    p.page = self.page;
                }
            }
        }
    }

    fn open_paragraph_child(&mut self, name: &str, e: &BytesStart<'_>, stack: &[String]) {
        let Some(Block::Paragraph(p)) = self.block.as_mut() else {
            return;
        };
        let parent = parent(stack);

        match name {
            "w:pStyle" if parent == "w:pPr" => p.style = attr(e, "w:val"),
            "w:numId" if parent == "w:numPr" => {
                p.num_id = attr(e, "w:val").and_then(|v| v.parse().ok());
            }
            "w:ilvl" if parent == "w:numPr" => {
                p.ilvl = attr(e, "w:val").and_then(|v| v.parse().ok());
            }
            "w:r" => p.run = Some(RunState::default()),
            "w:tab" if parent == "w:r" => {
                if let Some(run) = p.run.as_mut() {
                    run.text.push('\t');
                }
            }
            "w:br" | "w:cr" if parent == "w:r" => {
                if let Some(run) = p.run.as_mut() {
                    run.text.push('\n');
                }
            }
            _ if parent == "w:rPr" => {
                if let Some(run) = p.run.as_mut() {
                    apply_run_property(&mut run.formatting, name, e);
                }
            }
            "w:drawing" | "w:pict" => {
                let placement = if name == "w:pict" {
                    Placement::Vml
                } else {
                    Placement::Inline
                };
                let id = format!("d{}_{}", p.doc_index, p.drawing_count);
                p.drawing_count += 1;
                self.drawing = Some(DrawingState::new(
                    id,
                    p.doc_index,
                    placement,
                    stack.len(),
                    self.page,
                ));
            }
            _ => {}
        }
    }

    fn open_table_child(&mut self, name: &str, e: &BytesStart<'_>, stack: &[String]) {
        let Some(Block::Table(t)) = self.block.as_mut() else {
            return;
        };
        let parent = parent(stack);

        match name {
            "w:tbl" => t.depth += 1,
            "w:tr" if t.depth == 1 && parent == "w:tbl" => t.row = Some(Vec::new()),
            "w:tc" if t.depth == 1 && parent == "w:tr" => {
                t.cell = Some(CellState {
                    paragraphs: Vec::new(),
                    current: String::new(),
                    column_span: 1,
                    v_merge: None,
                });
            }
            "w:gridSpan" if t.depth == 1 && parent == "w:tcPr" => {
                if let Some(cell) = t.cell.as_mut() {
                    cell.column_span = attr(e, "w:val")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(1)
                        .max(1);
                }
            }
            "w:vMerge" if t.depth == 1 && parent == "w:tcPr" => {
                if let Some(cell) = t.cell.as_mut() {
                    cell.v_merge = match attr(e, "w:val").as_deref() {
                        Some("restart") => Some(VMerge::Start),
                        _ => Some(VMerge::Continue),
                    };
                }
            }
            "w:tab" | "w:br" | "w:cr" if parent == "w:r" => {
                if let Some(cell) = t.cell.as_mut() {
                    cell.current.push(' ');
                }
            }
            // Shapes inside tables are not diagram candidates.
            "w:drawing" | "w:pict" => self.skip_depth = Some(stack.len()),
            _ => {}
        }
    }

    fn close_paragraph_child(&mut self, name: &str) {
        let Some(Block::Paragraph(p)) = self.block.as_mut() else {
            return;
        };
        match name {
            "w:r" => {
                if let Some(run) = p.run.take() {
                    if !run.text.is_empty() {
                        p.runs.push(FormattedRun {
                            text: run.text,
                            formatting: run.formatting,
                        });
                    }
                }
            }
            "w:p" => {
                if let Some(Block::Paragraph(p)) = self.block.take() {
                    self.finish_paragraph(p);
                }
            }
            _ => {}
        }
    }

    fn close_table_child(&mut self, name: &str) {
        let Some(Block::Table(t)) = self.block.as_mut() else {
            return;
        };
        match name {
            "w:p" => {
                if let Some(cell) = t.cell.as_mut() {
                    let text = cell.current.trim().to_string();
                    cell.current.clear();
                    if !text.is_empty() {
                        cell.paragraphs.push(text);
                    }
                }
            }
            "w:tc" if t.depth == 1 => {
                if let Some(cell) = t.cell.take() {
                    let raw = RawCell {
                        text: cell.paragraphs.join(" "),
                        column_span: cell.column_span,
                        v_merge: cell.v_merge,
                    };
                    t.row.get_or_insert_with(Vec::new).push(raw);
                }
            }
            "w:tr" if t.depth == 1 => {
                if let Some(row) = t.row.take() {
                    t.rows.push(row);
                }
            }
            "w:tbl" if t.depth > 1 => t.depth -= 1,
            "w:tbl" => {
                if let Some(Block::Table(t)) = self.block.take() {
                    self.out.tables.push(RawTable {
                        id: format!("t{}", t.doc_index),
                        doc_index: t.doc_index,
                        rows: t.rows,
                    });
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, p: ParagraphState) {
        let text: String = p.runs.iter().map(|r| r.text.as_str()).collect();
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        // numId 0 removes numbering in Word.
        let num_id = p.num_id.filter(|&id| id != 0);
        let level_format = num_id.and_then(|id| {
            self.numbering
                .get(&id)
                .and_then(|levels| levels.get(&p.ilvl.unwrap_or(0)))
        });

        self.out.paragraphs.push(RawParagraph {
            doc_index: p.doc_index,
            text: text.to_string(),
            runs: p.runs,
            style: p.style,
            num_id,
            ilvl: p.ilvl,
            num_format: level_format.map(|f| f.num_format.clone()),
            lvl_text: level_format.and_then(|f| f.lvl_text.clone()),
            list_type: level_format.map(|f| list_kind_for_format(&f.num_format)),
            page_hint: Some(p.page),
        });
    }
}

impl XmlVisitor for BodyWalker<'_> {
    fn open(&mut self, name: &str, e: &BytesStart<'_>, stack: &[String]) {
        if self.skip_depth.is_some() {
            return;
        }
        // Fallback content duplicates the mc:Choice branch.
        if name == "mc:Fallback" {
            self.skip_depth = Some(stack.len());
            return;
        }

        self.track_page(name, e, stack);

        if let Some(drawing) = self.drawing.as_mut() {
            drawing.open(name, e, stack);
            return;
        }

        let at_body = parent(stack) == "w:body";
        match self.block {
            None if at_body && name == "w:p" => {
                let doc_index = self.take_index();
                self.block = Some(Block::Paragraph(ParagraphState {
                    doc_index,
                    page: self.page,
                    style: None,
                    num_id: None,
                    ilvl: None,
                    runs: Vec::new(),
                    run: None,
                    drawing_count: 0,
                }));
            }
            None if at_body && name == "w:tbl" => {
                let doc_index = self.take_index();
                self.block = Some(Block::Table(TableState {
                    doc_index,
                    depth: 1,
                    rows: Vec::new(),
                    row: None,
                    cell: None,
                }));
            }
            None => {}
            Some(Block::Paragraph(_)) => self.open_paragraph_child(name, e, stack),
            Some(Block::Table(_)) => self.open_table_child(name, e, stack),
        }
    }

    fn close(&mut self, name: &str, stack: &[String]) {
        if let Some(depth) = self.skip_depth {
            if stack.len() == depth {
                self.skip_depth = None;
            }
            return;
        }

        if let Some(depth) = self.drawing.as_ref().map(|d| d.depth) {
            if stack.len() == depth {
                if let Some(done) = self.drawing.take() {
                    self.out.drawings.push(done.finish());
                }
            } else if let Some(drawing) = self.drawing.as_mut() {
                drawing.close(stack);
            }
            return;
        }

        match self.block {
            Some(Block::Paragraph(_)) => self.close_paragraph_child(name),
            Some(Block::Table(_)) => self.close_table_child(name),
            None => {}
        }
    }

    fn text(&mut self, text: &str, stack: &[String]) {
        if self.skip_depth.is_some() {
            return;
        }
        if let Some(drawing) = self.drawing.as_mut() {
            drawing.text(text, stack);
            return;
        }
        if parent(stack) != "w:t" {
            return;
        }
        match self.block.as_mut() {
            Some(Block::Paragraph(p)) => {
                if let Some(run) = p.run.as_mut() {
                    run.text.push_str(text);
                }
            }
            Some(Block::Table(t)) => {
                if let Some(cell) = t.cell.as_mut() {
                    cell.current.push_str(text);
                }
            }
            None => {}
        }
    }
}

/// Apply one `w:rPr` child to a run's formatting.
fn apply_run_property(formatting: &mut TextFormatting, name: &str, e: &BytesStart<'_>) {
    match name {
        "w:b" => formatting.bold = on_off(e),
        "w:i" => formatting.italic = on_off(e),
        "w:u" => formatting.underline = on_off(e),
        "w:rStyle" => formatting.style = attr(e, "w:val"),
        // Half-points.
        "w:sz" => {
            formatting.font_size = attr(e, "w:val")
                .and_then(|v| v.parse::<f32>().ok())
                .map(|half_points| half_points / 2.0);
        }
        "w:color" => formatting.color = attr(e, "w:val"),
        _ => {}
    }
}
