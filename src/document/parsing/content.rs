//! Content extraction through the docx-rs object model
//!
//! An independent pass over the same document. It assigns doc_index the
//! same way the container pass does (one per body paragraph or table) so
//! the two passes can be reconciled by position.

use log::info;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use super::container::{RELS_PART, parse_relationships};
use super::formatting::{extract_numbering_info, extract_paragraph_runs};
use crate::document::records::{ContentExtraction, InlineImage, RawParagraph};
use crate::error::{ExtractError, Result};

const IMAGE_REL_SUFFIX: &str = "/image";

/// Run the content pass over in-memory .docx bytes.
pub fn extract_content(bytes: &[u8]) -> Result<ContentExtraction> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::ContentModel(e.to_string()))?;

    let mut paragraphs = Vec::new();
    let mut doc_index = 0usize;

    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                if let Some(record) = paragraph_record(para, doc_index) {
                    paragraphs.push(record);
                }
                doc_index += 1;
            }
            docx_rs::DocumentChild::Table(_) => doc_index += 1,
            _ => {}
        }
    }

    let inline_images = read_inline_images(bytes)?;

    info!(
        "content model: {} paragraphs, {} inline images over {} blocks",
        paragraphs.len(),
        inline_images.len(),
        doc_index
    );

    Ok(ContentExtraction {
        paragraphs,
        inline_images,
    })
}

fn paragraph_record(para: &docx_rs::Paragraph, doc_index: usize) -> Option<RawParagraph> {
    let runs = extract_paragraph_runs(para);
    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let numbering = para
        .property
        .numbering_property
        .as_ref()
        .and_then(extract_numbering_info);

    Some(RawParagraph {
        doc_index,
        text: text.to_string(),
        style: para.property.style.as_ref().map(|s| s.val.clone()),
        num_id: numbering.map(|(id, _)| id),
        ilvl: numbering.map(|(_, level)| level),
        runs,
        ..Default::default()
    })
}

/// Image relationships of the main document part.
fn read_inline_images(bytes: &[u8]) -> Result<Vec<InlineImage>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let xml = match archive.by_name(RELS_PART) {
        Ok(mut file) => {
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            data
        }
        Err(_) => return Ok(Vec::new()),
    };

    let relationships = parse_relationships(&xml)
        .map_err(|e| ExtractError::ContentModel(format!("relationships: {e}")))?;

    Ok(relationships
        .into_iter()
        .filter(|rel| rel.rel_type.ends_with(IMAGE_REL_SUFFIX))
        .map(|rel| InlineImage {
            content_type: guess_content_type(&rel.target).to_string(),
            rel_id: rel.id,
            target: rel.target,
        })
        .collect())
}

fn guess_content_type(target: &str) -> &'static str {
    let extension = target
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}
