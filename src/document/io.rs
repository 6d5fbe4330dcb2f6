//! File validation and on-disk artifacts
//!
//! Every pipeline stage can persist its output as pretty-printed JSON under
//! an output base directory, so later stages can be re-run from disk:
//!
//! ```text
//! <out>/_sanitized/<name>_output_xml.json
//! <out>/_sanitized/<name>_output_docx.json
//! <out>/_sanitized/<name>_sanitized.json
//! <out>/_comp/<name>_{list,table,diagram}_components.json
//! <out>/_comp/<name>_blocks.json
//! <out>/_meta/<name>.json
//! <out>/<name>.docjson
//! ```

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use super::models::{ContentBlock, DiagramData};

const SANITIZED_DIR: &str = "_sanitized";
const COMPONENTS_DIR: &str = "_comp";
const META_DIR: &str = "_meta";
const SANITIZED_SUFFIX: &str = "_sanitized";

/// Validates that the file is a legitimate .docx file
pub fn validate_docx_file(file_path: &Path) -> Result<()> {
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    if !extension.eq_ignore_ascii_case("docx") {
        bail!(
            "Invalid file format. Expected .docx file, got .{}\n\
            Note: only Word .docx files are supported (not .doc, .xlsx, .zip, etc.)",
            extension
        );
    }

    let file = File::open(file_path)
        .with_context(|| format!("cannot open {}", file_path.display()))?;
    let mut archive = ZipArchive::new(file)?;

    if archive.by_name("word/document.xml").is_err() {
        if archive.by_name("xl/workbook.xml").is_ok() {
            bail!(
                "This appears to be an Excel file (.xlsx).\n\
                Only Word documents (.docx) are supported."
            );
        }

        bail!(
            "Invalid .docx file: missing word/document.xml\n\
            This file may be corrupted or is not a valid Word document."
        );
    }

    Ok(())
}

fn input_name(input: &Path) -> &str {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
}

/// Paths of every artifact produced for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    base: PathBuf,
    name: String,
}

impl ArtifactLayout {
    pub fn new(base: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            name: name.into(),
        }
    }

    /// Layout for an input document: artifacts are named after its file stem.
    pub fn for_input(input: &Path, base: &Path) -> Self {
        Self::new(base, input_name(input))
    }

    /// One layout per input sharing `base`, with distinct names.
    ///
    /// Inputs whose stems collide are prefixed with their parent directory
    /// name; anything still taken gets a numeric suffix.
    pub fn for_batch(inputs: &[PathBuf], base: &Path) -> Vec<Self> {
        let mut stems: BTreeMap<&str, usize> = BTreeMap::new();
        for input in inputs {
            *stems.entry(input_name(input)).or_default() += 1;
        }

        let mut taken: BTreeSet<String> = BTreeSet::new();
        inputs
            .iter()
            .map(|input| {
                let stem = input_name(input);
                let mut name = match input
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                {
                    Some(dir) if stems[stem] > 1 => format!("{dir}_{stem}"),
                    _ => stem.to_string(),
                };
                if taken.contains(&name) {
                    let n = (2..)
                        .find(|n| !taken.contains(&format!("{name}_{n}")))
                        .unwrap_or_default();
                    name = format!("{name}_{n}");
                }
                if name != stem {
                    warn!("{} shares its name; writing it as {name}", input.display());
                }
                taken.insert(name.clone());
                Self::new(base, name)
            })
            .collect()
    }

    /// Recover the layout from a `<base>/_sanitized/<name>_sanitized.json` path.
    /// `base` overrides the directory the artifacts are written to.
    pub fn from_sanitized_path(path: &Path, base: Option<&Path>) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("not a sanitized artifact: {}", path.display()))?;
        let name = stem.strip_suffix(SANITIZED_SUFFIX).unwrap_or(stem);

        let base = match base {
            Some(base) => base.to_path_buf(),
            None => {
                let parent = path.parent().unwrap_or_else(|| Path::new("."));
                if parent.file_name().and_then(|n| n.to_str()) == Some(SANITIZED_DIR) {
                    parent.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
                } else {
                    parent.to_path_buf()
                }
            }
        };
        Ok(Self::new(base, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn in_dir(&self, dir: &str, suffix: &str) -> PathBuf {
        self.base.join(dir).join(format!("{}{suffix}", self.name))
    }

    pub fn xml_output(&self) -> PathBuf {
        self.in_dir(SANITIZED_DIR, "_output_xml.json")
    }

    pub fn docx_output(&self) -> PathBuf {
        self.in_dir(SANITIZED_DIR, "_output_docx.json")
    }

    pub fn sanitized(&self) -> PathBuf {
        self.in_dir(SANITIZED_DIR, "_sanitized.json")
    }

    pub fn list_components(&self) -> PathBuf {
        self.in_dir(COMPONENTS_DIR, "_list_components.json")
    }

    pub fn table_components(&self) -> PathBuf {
        self.in_dir(COMPONENTS_DIR, "_table_components.json")
    }

    pub fn diagram_components(&self) -> PathBuf {
        self.in_dir(COMPONENTS_DIR, "_diagram_components.json")
    }

    pub fn blocks(&self) -> PathBuf {
        self.in_dir(COMPONENTS_DIR, "_blocks.json")
    }

    pub fn metadata(&self) -> PathBuf {
        self.in_dir(META_DIR, ".json")
    }

    pub fn docjson(&self) -> PathBuf {
        self.base.join(format!("{}.docjson", self.name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableComponents {
    pub tables: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramComponents {
    pub diagrams: Vec<DiagramData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockComponents {
    pub blocks: Vec<ContentBlock>,
}

/// Write `value` as indented UTF-8 JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))?;
    debug!("wrote {}", path.display());
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Load a component file when `reuse` is set and it exists.
pub fn read_reusable<T: DeserializeOwned>(path: &Path, reuse: bool) -> Result<Option<T>> {
    if !reuse || !path.exists() {
        return Ok(None);
    }
    debug!("reusing {}", path.display());
    read_json(path).map(Some)
}
