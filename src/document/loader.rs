//! Document conversion and orchestration
//!
//! This module wires the stages together: the two extraction passes, the
//! sanitizers, the analyzers and the assembler. Each half can be run on its
//! own: [`parse_and_sanitize`] stops at the sanitized record, [`run_layout`]
//! starts from one on disk.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

use super::analysis::{
    ListComponents, analyze_lists, analyze_metadata, analyze_tables, assemble, build_diagrams,
    build_paragraph_blocks, build_sections, diagram_blocks, heading_indices, merge_blocks,
};
use super::io::{
    ArtifactLayout, BlockComponents, DiagramComponents, TableComponents, read_json,
    read_reusable, validate_docx_file, write_json,
};
use super::models::DocumentDocJson;
use super::parsing::{extract_container, extract_content};
use super::records::{ContainerExtraction, ContentExtraction, SanitizedDocument};
use super::sanitize::sanitize_document;
use crate::config::Config;
use crate::error::ExtractError;

/// Output of both extraction passes and their merge.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub container: ContainerExtraction,
    /// `None` when the object-model reader rejected the file.
    pub content: Option<ContentExtraction>,
    pub sanitized: SanitizedDocument,
}

/// Run both extraction passes over in-memory .docx bytes and sanitize.
///
/// Container errors are fatal. A content-model failure is logged and the
/// container pass supplies the runs instead.
pub fn extract_and_sanitize(bytes: &[u8]) -> std::result::Result<Extraction, ExtractError> {
    let container = extract_container(bytes)?;
    let content = match extract_content(bytes) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("content model pass failed, using container runs only: {e}");
            None
        }
    };
    let sanitized = sanitize_document(&container, content.as_ref());
    Ok(Extraction {
        container,
        content,
        sanitized,
    })
}

/// Validate, extract and sanitize one document, writing the raw and
/// sanitized records under `out_dir`.
pub fn parse_and_sanitize(path: &Path, out_dir: &Path) -> Result<(ArtifactLayout, SanitizedDocument)> {
    let layout = ArtifactLayout::for_input(path, out_dir);
    let sanitized = sanitize_into(path, &layout)?;
    Ok((layout, sanitized))
}

fn sanitize_into(path: &Path, layout: &ArtifactLayout) -> Result<SanitizedDocument> {
    validate_docx_file(path)?;
    info!("converting {}", path.display());

    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let extraction = extract_and_sanitize(&bytes).map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("{} stage failed for {}", stage, path.display()))
    })?;

    write_json(&layout.xml_output(), &extraction.container)?;
    match &extraction.content {
        Some(content) => write_json(&layout.docx_output(), content)?,
        // Don't leave an earlier run's output next to this run's records.
        None if layout.docx_output().exists() => std::fs::remove_file(layout.docx_output())
            .with_context(|| format!("cannot remove {}", layout.docx_output().display()))?,
        None => {}
    }
    write_json(&layout.sanitized(), &extraction.sanitized)?;

    Ok(extraction.sanitized)
}

/// Analyze and assemble a sanitized record in memory, without touching disk.
pub fn analyze_document(sanitized: &SanitizedDocument, config: &Config) -> Result<DocumentDocJson> {
    layout_stage(sanitized, None, false, config)
}

/// Re-run the analysis half from a sanitized record on disk.
///
/// Artifacts go next to the record unless `out_dir` is given. Component
/// files already on disk are reused when `reuse_components` is set.
pub fn run_layout(
    sanitized_path: &Path,
    out_dir: Option<&Path>,
    config: &Config,
) -> Result<DocumentDocJson> {
    let sanitized: SanitizedDocument = read_json(sanitized_path)?;
    let layout = ArtifactLayout::from_sanitized_path(sanitized_path, out_dir)?;
    layout_stage(&sanitized, Some(&layout), config.reuse_components, config)
}

/// Full conversion of one .docx file into `<out_dir>/<name>.docjson`.
///
/// Components are always recomputed from the freshly sanitized record.
pub fn convert_document(path: &Path, out_dir: &Path, config: &Config) -> Result<DocumentDocJson> {
    let layout = ArtifactLayout::for_input(path, out_dir);
    convert_document_as(path, &layout, config)
}

/// Full conversion with an explicit artifact layout.
pub fn convert_document_as(
    path: &Path,
    layout: &ArtifactLayout,
    config: &Config,
) -> Result<DocumentDocJson> {
    let sanitized = sanitize_into(path, layout)?;
    layout_stage(&sanitized, Some(layout), false, config)
}

fn layout_stage(
    sanitized: &SanitizedDocument,
    layout: Option<&ArtifactLayout>,
    reuse: bool,
    config: &Config,
) -> Result<DocumentDocJson> {
    let rules = config.compile_rules()?;
    let reuse = reuse && layout.is_some();
    let emit = config.emit_components;

    let sections = build_sections(&sanitized.paragraphs, sanitized.last_doc_index());
    let headings = heading_indices(&sections);

    let lists: ListComponents =
        component(layout.map(ArtifactLayout::list_components), reuse, emit, || {
            analyze_lists(&sanitized.paragraphs, &headings)
        })?;
    let tables: TableComponents =
        component(layout.map(ArtifactLayout::table_components), reuse, emit, || {
            TableComponents {
                tables: analyze_tables(&sanitized.tables),
            }
        })?;
    let diagrams: DiagramComponents =
        component(layout.map(ArtifactLayout::diagram_components), reuse, emit, || {
            DiagramComponents {
                diagrams: build_diagrams(&sanitized.drawings),
            }
        })?;

    let paragraphs = build_paragraph_blocks(&sanitized.paragraphs, &lists.consumed, &headings);
    let diagrams = diagram_blocks(diagrams.diagrams);
    let blocks = merge_blocks([paragraphs, lists.lists, tables.tables, diagrams]);

    let metadata = analyze_metadata(sanitized, &rules);
    let document = assemble(&config.version, metadata, sections, blocks);

    if let Some(layout) = layout {
        if emit {
            write_json(
                &layout.blocks(),
                &BlockComponents {
                    blocks: document.blocks.clone(),
                },
            )?;
        }
        write_json(&layout.metadata(), &document.metadata)?;
        write_json(&layout.docjson(), &document)?;
        info!("wrote {}", layout.docjson().display());
    }

    Ok(document)
}

/// Reuse a component file when allowed, else compute it and optionally
/// persist it.
fn component<T, F>(path: Option<PathBuf>, reuse: bool, emit: bool, compute: F) -> Result<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> T,
{
    let Some(path) = path else {
        return Ok(compute());
    };
    if let Some(existing) = read_reusable(&path, reuse)? {
        return Ok(existing);
    }
    let value = compute();
    if emit {
        write_json(&path, &value)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::records::{ParagraphRecord, SanitizedTable};

    fn sample() -> SanitizedDocument {
        let para = |doc_index: usize, text: &str| ParagraphRecord {
            doc_index,
            text: text.into(),
            ..Default::default()
        };
        SanitizedDocument {
            paragraphs: vec![
                para(0, "Cover"),
                para(1, "1. Purpose"),
                para(2, "Explain the purpose."),
                para(4, "2. Scope"),
            ],
            tables: vec![SanitizedTable {
                id: "tbl_3".into(),
                doc_index: 3,
                rows: 1,
                cols: 1,
                data: vec![vec!["x".into()]],
                preceding_text: Some("Explain the purpose.".into()),
            }],
            body_len: 6,
            ..Default::default()
        }
    }

    #[test]
    fn test_analyze_document_in_memory() {
        let doc = analyze_document(&sample(), &Config::default()).unwrap();
        let ids: Vec<&str> = doc.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p2", "table_3"]);
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].block_ids, vec!["p2", "table_3"]);
        assert_eq!(doc.sections[1].span, [4, 6]);
        assert!(doc.sections[1].block_ids.is_empty());
    }

    #[test]
    fn test_run_layout_writes_artifacts_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path(), "sample");
        write_json(&layout.sanitized(), &sample()).unwrap();

        let config = Config::default();
        let first = run_layout(&layout.sanitized(), None, &config).unwrap();
        let first_bytes = std::fs::read(layout.docjson()).unwrap();
        assert!(layout.list_components().exists());
        assert!(layout.table_components().exists());
        assert!(layout.diagram_components().exists());
        assert!(layout.blocks().exists());
        assert!(layout.metadata().exists());

        let second = run_layout(&layout.sanitized(), None, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(layout.docjson()).unwrap(), first_bytes);
    }

    #[test]
    fn test_components_not_emitted_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path(), "quiet");
        write_json(&layout.sanitized(), &sample()).unwrap();

        let config = Config {
            emit_components: false,
            ..Config::default()
        };
        run_layout(&layout.sanitized(), None, &config).unwrap();
        assert!(!layout.list_components().exists());
        assert!(layout.docjson().exists());
    }
}
