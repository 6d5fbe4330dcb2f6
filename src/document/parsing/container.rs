//! Container extraction
//!
//! Opens the zip archive and parses every part the pipeline needs into raw
//! records: numbering definitions, the body, headers and footers,
//! relationships and document properties. The body and numbering parts are
//! required to be well formed; the others degrade to empty values.

use log::{info, warn};
use quick_xml::events::BytesStart;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;
use zip::result::ZipError;

use super::body::{DOCUMENT_PART, parse_body};
use super::xml::{XmlVisitor, attr, parent, walk};
use crate::document::records::*;
use crate::error::{ExtractError, Result};

const NUMBERING_PART: &str = "word/numbering.xml";
pub(crate) const RELS_PART: &str = "word/_rels/document.xml.rels";
const APP_PART: &str = "docProps/app.xml";
const CORE_PART: &str = "docProps/core.xml";

/// Run the container pass over in-memory .docx bytes.
pub fn extract_container(bytes: &[u8]) -> Result<ContainerExtraction> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let numbering = match read_part(&mut archive, NUMBERING_PART)? {
        Some(xml) => parse_numbering(&xml)?,
        None => NumberingMap::new(),
    };

    let document = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or(ExtractError::MissingPart(DOCUMENT_PART))?;
    let body = parse_body(&document, &numbering)?;

    let (headers, footers) = read_headers_footers(&mut archive)?;

    let relationships = match read_part(&mut archive, RELS_PART)? {
        Some(xml) => parse_relationships(&xml).unwrap_or_else(|e| {
            warn!("ignoring relationships: {e}");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let page_count = match read_part(&mut archive, APP_PART)? {
        Some(xml) => leaf_texts(&xml, APP_PART)
            .map(|texts| {
                texts
                    .get("Pages")
                    .and_then(|v| v.trim().parse::<u32>().ok())
            })
            .unwrap_or_else(|e| {
                warn!("ignoring application properties: {e}");
                None
            }),
        None => None,
    };

    let core_properties = match read_part(&mut archive, CORE_PART)? {
        Some(xml) => leaf_texts(&xml, CORE_PART)
            .map(|texts| CoreProperties {
                title: texts.get("dc:title").cloned(),
                creator: texts.get("dc:creator").cloned(),
                created: texts.get("dcterms:created").cloned(),
                modified: texts.get("dcterms:modified").cloned(),
            })
            .unwrap_or_else(|e| {
                warn!("ignoring core properties: {e}");
                CoreProperties::default()
            }),
        None => CoreProperties::default(),
    };

    info!(
        "container: {} paragraphs, {} tables, {} drawings, {} headers, {} footers",
        body.paragraphs.len(),
        body.tables.len(),
        body.drawings.len(),
        headers.len(),
        footers.len()
    );

    Ok(ContainerExtraction {
        paragraphs: body.paragraphs,
        tables: body.tables,
        drawings: body.drawings,
        headers,
        footers,
        relationships,
        numbering,
        page_count,
        core_properties,
        body_len: body.body_len,
    })
}

/// Read a part by name; `None` when the archive does not contain it.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

fn read_headers_footers<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<(Vec<PartText>, Vec<PartText>)> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| {
            (n.starts_with("word/header") || n.starts_with("word/footer")) && n.ends_with(".xml")
        })
        .map(str::to_string)
        .collect();
    // header2.xml before header10.xml
    names.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    let mut headers = Vec::new();
    let mut footers = Vec::new();
    for name in names {
        let Some(xml) = read_part(archive, &name)? else {
            continue;
        };
        match part_text(&xml, &name) {
            Ok(text) => {
                let record = PartText {
                    part: name.clone(),
                    text,
                };
                if name.starts_with("word/header") {
                    headers.push(record);
                } else {
                    footers.push(record);
                }
            }
            Err(e) => warn!("skipping unreadable part {name}: {e}"),
        }
    }
    Ok((headers, footers))
}

/// Text of a header or footer: runs concatenated per paragraph, paragraphs
/// joined by a single space.
fn part_text(xml: &[u8], part: &str) -> Result<String> {
    #[derive(Default)]
    struct PartVisitor {
        paragraphs: Vec<String>,
        current: String,
    }

    impl XmlVisitor for PartVisitor {
        fn close(&mut self, name: &str, _stack: &[String]) {
            if name == "w:p" {
                let text = self.current.trim().to_string();
                self.current.clear();
                if !text.is_empty() {
                    self.paragraphs.push(text);
                }
            }
        }

        fn text(&mut self, text: &str, stack: &[String]) {
            if parent(stack) == "w:t" {
                self.current.push_str(text);
            }
        }
    }

    let mut visitor = PartVisitor::default();
    walk(xml, part, &mut visitor)?;
    Ok(visitor.paragraphs.join(" "))
}

/// Parse `word/numbering.xml`, resolving each `w:num` through its
/// `w:abstractNumId`.
pub(crate) fn parse_numbering(xml: &[u8]) -> Result<NumberingMap> {
    #[derive(Default)]
    struct NumberingVisitor {
        abstracts: BTreeMap<String, BTreeMap<u8, LevelFormat>>,
        current_abstract: Option<String>,
        current_level: Option<(u8, Option<String>, Option<String>)>,
        current_num: Option<u32>,
        nums: Vec<(u32, String)>,
    }

    impl XmlVisitor for NumberingVisitor {
        fn open(&mut self, name: &str, e: &BytesStart<'_>, stack: &[String]) {
            let parent = parent(stack);
            match name {
                "w:abstractNum" => self.current_abstract = attr(e, "w:abstractNumId"),
                "w:lvl" if parent == "w:abstractNum" => {
                    self.current_level = attr(e, "w:ilvl")
                        .and_then(|v| v.parse().ok())
                        .map(|ilvl| (ilvl, None, None));
                }
                "w:numFmt" if parent == "w:lvl" => {
                    if let Some(level) = self.current_level.as_mut() {
                        level.1 = attr(e, "w:val");
                    }
                }
                "w:lvlText" if parent == "w:lvl" => {
                    if let Some(level) = self.current_level.as_mut() {
                        level.2 = attr(e, "w:val");
                    }
                }
                "w:num" => self.current_num = attr(e, "w:numId").and_then(|v| v.parse().ok()),
                "w:abstractNumId" if parent == "w:num" => {
                    if let (Some(num), Some(abstract_id)) = (self.current_num, attr(e, "w:val")) {
                        self.nums.push((num, abstract_id));
                    }
                }
                _ => {}
            }
        }

        fn close(&mut self, name: &str, _stack: &[String]) {
            match name {
                "w:lvl" => {
                    if let (Some(abstract_id), Some((ilvl, Some(num_format), lvl_text))) =
                        (self.current_abstract.as_ref(), self.current_level.take())
                    {
                        self.abstracts
                            .entry(abstract_id.clone())
                            .or_default()
                            .insert(ilvl, LevelFormat {
                                num_format,
                                lvl_text,
                            });
                    }
                }
                "w:abstractNum" => self.current_abstract = None,
                "w:num" => self.current_num = None,
                _ => {}
            }
        }
    }

    let mut visitor = NumberingVisitor::default();
    walk(xml, NUMBERING_PART, &mut visitor)?;

    let mut numbering = NumberingMap::new();
    for (num_id, abstract_id) in visitor.nums {
        if let Some(levels) = visitor.abstracts.get(&abstract_id) {
            numbering.insert(num_id, levels.clone());
        }
    }
    Ok(numbering)
}

pub(crate) fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>> {
    #[derive(Default)]
    struct RelsVisitor {
        relationships: Vec<Relationship>,
    }

    impl XmlVisitor for RelsVisitor {
        fn open(&mut self, name: &str, e: &BytesStart<'_>, _stack: &[String]) {
            if name != "Relationship" {
                return;
            }
            if let (Some(id), Some(rel_type), Some(target)) =
                (attr(e, "Id"), attr(e, "Type"), attr(e, "Target"))
            {
                self.relationships.push(Relationship {
                    id,
                    rel_type,
                    target,
                    target_mode: attr(e, "TargetMode"),
                });
            }
        }
    }

    let mut visitor = RelsVisitor::default();
    walk(xml, RELS_PART, &mut visitor)?;
    Ok(visitor.relationships)
}

/// Text content of every leaf element, keyed by qualified name. The first
/// occurrence wins.
fn leaf_texts(xml: &[u8], part: &str) -> Result<BTreeMap<String, String>> {
    #[derive(Default)]
    struct LeafVisitor {
        texts: BTreeMap<String, String>,
    }

    impl XmlVisitor for LeafVisitor {
        fn text(&mut self, text: &str, stack: &[String]) {
            let text = text.trim();
            if !text.is_empty() {
                self.texts
                    .entry(parent(stack).to_string())
                    .or_insert_with(|| text.to_string());
            }
        }
    }

    let mut visitor = LeafVisitor::default();
    walk(xml, part, &mut visitor)?;
    Ok(visitor.texts)
}
