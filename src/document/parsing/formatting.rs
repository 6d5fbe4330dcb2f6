//! Text extraction and formatting utilities
//!
//! This module handles extraction of text and formatting information
//! from docx-rs paragraph and run elements.

use std::fmt::Debug;

use crate::document::models::{FormattedRun, TextFormatting};

/// Collect the runs of a paragraph, descending into insertions and
/// hyperlinks. Deletions are skipped.
pub(crate) fn extract_paragraph_runs(para: &docx_rs::Paragraph) -> Vec<FormattedRun> {
    let mut runs = Vec::new();
    collect_runs(&para.children, &mut runs);
    runs
}

fn collect_runs(children: &[docx_rs::ParagraphChild], runs: &mut Vec<FormattedRun>) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run(run, runs),
            docx_rs::ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let docx_rs::InsertChild::Run(run) = child {
                        push_run(run, runs);
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => collect_runs(&link.children, runs),
            _ => {}
        }
    }
}

fn push_run(run: &docx_rs::Run, runs: &mut Vec<FormattedRun>) {
    let text = extract_run_text(run);
    if !text.is_empty() {
        runs.push(FormattedRun {
            text,
            formatting: extract_run_formatting(run),
        });
    }
}

/// Extract text from a run using docx-rs features
pub(crate) fn extract_run_text(run: &docx_rs::Run) -> String {
    let mut text = String::new();

    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(text_elem) => {
                text.push_str(&text_elem.text);
            }
            docx_rs::RunChild::Tab(_) => {
                text.push('\t');
            }
            docx_rs::RunChild::Break(_) => {
                // Break types are private, so we'll just add a line break
                text.push('\n');
            }
            _ => {}
        }
    }

    text
}

/// Extract formatting information from a run
pub(crate) fn extract_run_formatting(run: &docx_rs::Run) -> TextFormatting {
    let props = &run.run_property;

    TextFormatting {
        bold: props.bold.as_ref().is_some_and(toggle_enabled),
        italic: props.italic.as_ref().is_some_and(toggle_enabled),
        underline: props
            .underline
            .as_ref()
            .is_some_and(|u| debug_field(u, "val").as_deref() != Some("none")),
        style: props.style.as_ref().and_then(|s| debug_field(s, "val")),
        // Half-points.
        font_size: props
            .sz
            .as_ref()
            .and_then(|sz| debug_field(sz, "val"))
            .and_then(|v| v.parse::<f32>().ok())
            .map(|half_points| half_points / 2.0),
        color: props.color.as_ref().and_then(|c| debug_field(c, "val")),
    }
}

/// Extract numbering information from docx-rs numbering properties
pub(crate) fn extract_numbering_info(num_pr: &docx_rs::NumberingProperty) -> Option<(u32, u8)> {
    let num_id = num_pr.id.as_ref()?.id as u32;
    let level = num_pr.level.as_ref().map(|l| l.val as u8).unwrap_or(0);
    Some((num_id, level))
}

fn toggle_enabled<T: Debug>(value: &T) -> bool {
    debug_field(value, "val").as_deref() != Some("false")
}

/// Read a field through the `Debug` representation, as a workaround for
/// private fields in docx-rs property types. Quoted values are unquoted.
fn debug_field<T: Debug>(value: &T, field: &str) -> Option<String> {
    let debug = format!("{value:?}");
    let marker = format!("{field}: ");
    let start = debug.find(&marker)? + marker.len();
    let rest = &debug[start..];

    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        return Some(quoted[..end].to_string());
    }

    let end = rest
        .find(|c: char| c == ',' || c == ' ' || c == '}' || c == ')')
        .unwrap_or(rest.len());
    let value = &rest[..end];
    (!value.is_empty()).then(|| value.to_string())
}
