//! Markdown parsing into a mind-map tree.
//!
//! This module handles:
//! - Parsing markdown with comrak into an arena tree
//! - Recovering from non-hierarchical blocks with structured warnings
//! - Loading source records stored as JSON

mod parser;
mod types;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use parser::{parse, parse_with_title};
pub use types::{
    InlineSpan, InlineStyle, MindMap, Node, NodeId, NodeKind, ParseOutcome, ParseWarning,
    WarningKind,
};

/// A stored markdown document as handed over by the persistence layer.
///
/// Only `markdown` drives the tree; `title` is the root label fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub markdown: String,
    #[serde(default, rename = "createdAt", alias = "created_at")]
    pub created_at: Option<String>,
}

impl SourceDocument {
    /// Wrap plain markdown read from `path`; the file stem becomes id and title.
    pub fn from_markdown(path: &Path, markdown: String) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id: stem.clone(),
            title: (!stem.is_empty()).then_some(stem),
            markdown,
            created_at: None,
        }
    }

    /// Parse the markdown, falling back to the record title for the root.
    pub fn parse(&self) -> ParseOutcome {
        parse_with_title(&self.markdown, self.title.as_deref())
    }
}

/// Errors loading a source file.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document record in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns true if the file holds a JSON document record.
pub fn is_record_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Interpret file content as either a JSON record or plain markdown.
pub fn source_from_content(path: &Path, content: String) -> Result<SourceDocument, RecordError> {
    if is_record_file(path) {
        serde_json::from_str(&content).map_err(|source| RecordError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        Ok(SourceDocument::from_markdown(path, content))
    }
}

/// Read a source file from disk.
pub fn load_source(path: &Path) -> Result<SourceDocument, RecordError> {
    let content = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    source_from_content(path, content)
}
