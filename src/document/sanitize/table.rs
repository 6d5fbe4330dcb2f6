//! Dense table grids
//!
//! Horizontal spans and vertical merges are expanded so every grid position
//! holds the text of the cell that covers it.

use crate::document::cleanup::normalize_whitespace;
use crate::document::records::{RawTable, SanitizedTable, VMerge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Free,
    Plain,
    Start,
    Continue,
    /// A continue cell whose text has already been filled.
    Resolved,
}

struct Placed {
    row: usize,
    col: usize,
    span: usize,
}

pub fn sanitize_table(raw: &RawTable, preceding_text: Option<String>) -> SanitizedTable {
    let rows = raw.rows.len();
    let cols = raw
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.column_span.max(1)).sum::<usize>())
        .max()
        .unwrap_or(0);

    let mut data = vec![vec![String::new(); cols]; rows];
    let mut marks = vec![vec![Mark::Free; cols]; rows];
    let mut starts = Vec::new();

    for (r, row) in raw.rows.iter().enumerate() {
        let mut c = 0;
        for cell in row {
            while c < cols && marks[r][c] != Mark::Free {
                c += 1;
            }
            if c >= cols {
                break;
            }
            let span = cell.column_span.max(1).min(cols - c);
            let mark = match cell.v_merge {
                Some(VMerge::Start) => Mark::Start,
                Some(VMerge::Continue) => Mark::Continue,
                None => Mark::Plain,
            };
            let text = normalize_whitespace(&cell.text);
            for k in c..c + span {
                data[r][k] = text.clone();
                marks[r][k] = mark;
            }
            if mark == Mark::Start {
                starts.push(Placed { row: r, col: c, span });
            }
            c += span;
        }
    }

    for anchor in &starts {
        let columns = anchor.col..anchor.col + anchor.span;
        let text = data[anchor.row][anchor.col].clone();
        let mut r = anchor.row + 1;
        while r < rows && columns.clone().all(|k| marks[r][k] == Mark::Continue) {
            for k in columns.clone() {
                data[r][k] = text.clone();
                marks[r][k] = Mark::Resolved;
            }
            r += 1;
        }
    }

    // Continue cells without a start above inherit from the row above.
    for r in 0..rows {
        for k in 0..cols {
            if marks[r][k] == Mark::Continue {
                if r > 0 {
                    data[r][k] = data[r - 1][k].clone();
                }
                marks[r][k] = Mark::Resolved;
            }
        }
    }

    SanitizedTable {
        id: raw.id.clone(),
        doc_index: raw.doc_index,
        rows,
        cols,
        data,
        preceding_text,
    }
}
