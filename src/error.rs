//! Error types for document extraction.

use std::io;
use thiserror::Error;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// The extraction stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractStage {
    Archive,
    Body,
    Numbering,
    Relationships,
    ContentModel,
    Io,
}

impl std::fmt::Display for ExtractStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExtractStage::Archive => "archive",
            ExtractStage::Body => "body",
            ExtractStage::Numbering => "numbering",
            ExtractStage::Relationships => "relationships",
            ExtractStage::ContentModel => "content-model",
            ExtractStage::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors that abort extraction of a single document.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The zip container could not be opened or read.
    #[error("corrupt container archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A part the pipeline cannot do without is absent.
    #[error("missing required part: {0}")]
    MissingPart(&'static str),

    /// An XML part failed to parse.
    #[error("malformed XML in {part}: {message}")]
    MalformedXml { part: String, message: String },

    /// The object-model reader rejected the document.
    #[error("content model could not read the document: {0}")]
    ContentModel(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExtractError {
    pub(crate) fn xml(part: &str, err: impl std::fmt::Display) -> Self {
        ExtractError::MalformedXml {
            part: part.to_string(),
            message: err.to_string(),
        }
    }

    /// Tag identifying which extraction stage failed.
    pub fn stage(&self) -> ExtractStage {
        match self {
            ExtractError::Archive(_) => ExtractStage::Archive,
            ExtractError::MissingPart(_) => ExtractStage::Body,
            ExtractError::MalformedXml { part, .. } => {
                if part.contains("numbering") {
                    ExtractStage::Numbering
                } else if part.contains("_rels") {
                    ExtractStage::Relationships
                } else {
                    ExtractStage::Body
                }
            }
            ExtractError::ContentModel(_) => ExtractStage::ContentModel,
            ExtractError::Io(_) => ExtractStage::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::MissingPart("word/document.xml");
        assert_eq!(err.to_string(), "missing required part: word/document.xml");

        let err = ExtractError::xml("word/numbering.xml", "unexpected end");
        assert_eq!(
            err.to_string(),
            "malformed XML in word/numbering.xml: unexpected end"
        );
    }

    #[test]
    fn test_stage_tags() {
        assert_eq!(
            ExtractError::xml("word/numbering.xml", "x").stage(),
            ExtractStage::Numbering
        );
        assert_eq!(
            ExtractError::xml("word/document.xml", "x").stage(),
            ExtractStage::Body
        );
        assert_eq!(
            ExtractError::xml("word/_rels/document.xml.rels", "x").stage(),
            ExtractStage::Relationships
        );
        assert_eq!(
            ExtractError::ContentModel("bad".into()).stage().to_string(),
            "content-model"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ExtractError = io_err.into();
        assert!(matches!(err, ExtractError::Io(_)));
        assert_eq!(err.stage(), ExtractStage::Io);
    }
}
