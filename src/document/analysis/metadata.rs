//! Document metadata by pattern matching
//!
//! Each field is looked up in three tiers: header and footer text, then
//! table cells, then the whole document text. The first hit wins; a field
//! with no hit stays unset.

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::cleanup::normalize_whitespace;
use crate::document::models::DocumentMetadata;
use crate::document::records::SanitizedDocument;

/// Which neighbour of a label cell holds the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelDirection {
    #[default]
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRule {
    pub label: String,
    #[serde(default)]
    pub direction: LabelDirection,
    /// Only match in this row (0-based) of the first table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_table_row: Option<usize>,
}

impl LabelRule {
    fn applies_to(&self, table: usize, row: usize) -> bool {
        self.first_table_row.is_none_or(|r| table == 0 && row == r)
    }
}

/// Lookup rules for one metadata field.
///
/// A pattern yields its first capture group when it has one, else the whole
/// match. Effective-date patterns capture year, month and day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub labels: Vec<LabelRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRules {
    pub document_type: FieldRule,
    pub category: FieldRule,
    pub title: FieldRule,
    pub doc_number: FieldRule,
    pub revision: FieldRule,
    pub effective_date: FieldRule,
    pub author: FieldRule,
}

fn rule(patterns: &[&str], labels: &[(&str, LabelDirection)]) -> FieldRule {
    FieldRule {
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        labels: labels
            .iter()
            .map(|&(label, direction)| LabelRule {
                label: label.to_string(),
                direction,
                first_table_row: None,
            })
            .collect(),
    }
}

impl Default for MetadataRules {
    fn default() -> Self {
        use LabelDirection::{Next, Previous};
        MetadataRules {
            document_type: rule(
                &[
                    r"(기술기준\s+[^ ]+)",
                    r"^.*기술기준포항제철소.*$",
                    r"(?i)\bdocument\s+type\s*:\s*([^\n|]+)",
                ],
                &[("문서유형", Next), ("Document Type", Next)],
            ),
            category: rule(
                &[
                    r"포항제철소\s*(.*?)\s*[A-Z]{2}",
                    r"(?i)\bcategory\s*:\s*([^\n|]+)",
                ],
                &[("분류", Next), ("Category", Next)],
            ),
            title: FieldRule {
                labels: [
                    rule(&[], &[("제목", Next), ("Title", Next)]).labels,
                    vec![LabelRule {
                        label: "Rev.".into(),
                        direction: Previous,
                        first_table_row: Some(1),
                    }],
                ]
                .concat(),
                ..rule(
                    &[
                        r"Page:\s*\d+\s*/\s*\d+\s*(.*?)\s*Rev\.",
                        r"(?i)\btitle\s*:\s*([^\n|]+)",
                    ],
                    &[],
                )
            },
            doc_number: rule(
                &[
                    r"TP-\d{3}-\d{3}-\d{3}",
                    r"(?i)\bdoc(?:ument)?\s*(?:no\.?|number)\s*[:#]?\s*([A-Z0-9][A-Z0-9\-./]*)",
                ],
                &[("문서번호", Next)],
            ),
            revision: rule(
                &[r"Rev[.\s]*:\s*(\d+)", r"(?i)\brevision\s*[:.]?\s*(\d+)"],
                &[],
            ),
            effective_date: rule(
                &[
                    r#"시행일[:\s]*['"]?\s*(\d{2,4})[.\-/](\d{1,2})[.\-/](\d{1,2})"#,
                    r#"(?s)시행일.*?['"]?\s*(\d{2})[.\-/](\d{1,2})[.\-/](\d{1,2})"#,
                    r"(?i)\beffective\s+date\s*:?\s*(\d{4})[.\-/](\d{1,2})[.\-/](\d{1,2})",
                ],
                &[],
            ),
            author: rule(
                &[r"(?i)\bauthor\s*:\s*([^\n|]+)"],
                &[("작성자", Next), ("Author", Next), ("Prepared by", Next)],
            ),
        }
    }
}

struct CompiledField {
    name: &'static str,
    patterns: Vec<Regex>,
    labels: Vec<LabelRule>,
    date: bool,
}

impl CompiledField {
    fn new(name: &'static str, rule: &FieldRule, date: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            patterns: rule
                .patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
            labels: rule.labels.clone(),
            date,
        })
    }

    fn match_text(&self, text: &str) -> Option<String> {
        self.patterns.iter().find_map(|re| {
            let caps = re.captures(text)?;
            let value = if self.date && caps.len() >= 4 {
                let part = |i: usize| caps.get(i).map(|m| m.as_str());
                format!(
                    "{}.{:0>2}.{:0>2}",
                    part(1)?,
                    part(2)?,
                    part(3)?
                )
            } else {
                caps.get(1).or_else(|| caps.get(0))?.as_str().to_string()
            };
            let value = normalize_whitespace(&value);
            (!value.is_empty()).then_some(value)
        })
    }

    fn match_label(&self, row: &[String], table: usize, row_index: usize) -> Option<String> {
        for (i, cell) in row.iter().enumerate() {
            for rule in &self.labels {
                if !rule.applies_to(table, row_index) {
                    continue;
                }
                if !cell.to_lowercase().contains(&rule.label.to_lowercase()) {
                    continue;
                }
                if let Some(value) = neighbour(row, i, rule.direction) {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// The first non-empty neighbour that is not part of the same merged label.
fn neighbour(row: &[String], index: usize, direction: LabelDirection) -> Option<String> {
    let label = &row[index];
    let candidates: Box<dyn Iterator<Item = &String>> = match direction {
        LabelDirection::Next => Box::new(row[index + 1..].iter()),
        LabelDirection::Previous => Box::new(row[..index].iter().rev()),
    };
    candidates
        .filter(|cell| *cell != label)
        .map(|cell| normalize_whitespace(cell))
        .find(|cell| !cell.is_empty())
}

/// Metadata rules with every pattern compiled.
pub struct CompiledRules {
    fields: [CompiledField; 7],
}

impl CompiledRules {
    pub fn new(rules: &MetadataRules) -> Result<Self, regex::Error> {
        Ok(Self {
            fields: [
                CompiledField::new("document_type", &rules.document_type, false)?,
                CompiledField::new("category", &rules.category, false)?,
                CompiledField::new("title", &rules.title, false)?,
                CompiledField::new("doc_number", &rules.doc_number, false)?,
                CompiledField::new("revision", &rules.revision, false)?,
                CompiledField::new("effective_date", &rules.effective_date, true)?,
                CompiledField::new("author", &rules.author, false)?,
            ],
        })
    }
}

impl Default for CompiledRules {
    fn default() -> Self {
        match Self::new(&MetadataRules::default()) {
            Ok(rules) => rules,
            Err(e) => unreachable!("built-in metadata patterns are valid: {e}"),
        }
    }
}

fn lookup(field: &CompiledField, doc: &SanitizedDocument, all_text: &str) -> Option<String> {
    let part_texts = doc.headers.iter().chain(&doc.footers).map(|p| p.text.as_str());
    for text in part_texts {
        if let Some(value) = field.match_text(text) {
            debug!("{}: '{value}' from header/footer", field.name);
            return Some(value);
        }
    }

    for (t, table) in doc.tables.iter().enumerate() {
        for (r, row) in table.data.iter().enumerate() {
            if let Some(value) = field.match_label(row, t, r) {
                debug!("{}: '{value}' from table label", field.name);
                return Some(value);
            }
            if let Some(value) = row.iter().find_map(|cell| field.match_text(cell)) {
                debug!("{}: '{value}' from table cell", field.name);
                return Some(value);
            }
        }
    }

    let value = field.match_text(all_text)?;
    debug!("{}: '{value}' from document text", field.name);
    Some(value)
}

/// Headers, footers, paragraphs and table cells, one per line.
fn aggregate_text(doc: &SanitizedDocument) -> String {
    let mut lines: Vec<&str> = Vec::new();
    lines.extend(doc.headers.iter().map(|p| p.text.as_str()));
    lines.extend(doc.footers.iter().map(|p| p.text.as_str()));
    lines.extend(doc.paragraphs.iter().map(|p| p.text.as_str()));
    for table in &doc.tables {
        for row in &table.data {
            lines.extend(row.iter().map(String::as_str));
        }
    }
    lines.join("\n")
}

pub fn analyze_metadata(doc: &SanitizedDocument, rules: &CompiledRules) -> DocumentMetadata {
    let all_text = aggregate_text(doc);
    let [document_type, category, title, doc_number, revision, effective_date, author] = rules
        .fields
        .each_ref()
        .map(|field| lookup(field, doc, &all_text));

    let metadata = DocumentMetadata {
        document_type,
        category,
        title,
        doc_number,
        revision,
        effective_date,
        author,
        page_count: doc.page_count,
    };
    info!(
        "metadata: doc_number={:?} revision={:?} effective_date={:?}",
        metadata.doc_number, metadata.revision, metadata.effective_date
    );
    metadata
}
