//! BibTeX bibliography loading.
//!
//! Parsing and re-serialization are delegated to the `biblatex` crate; this
//! module only wraps the file read and flattens field values to plain text.

use std::fs;
use std::path::Path;

use biblatex::{Bibliography, ChunksExt, Entry};
use thiserror::Error;

/// Errors that can occur when loading a bibliography.
#[derive(Error, Debug)]
pub enum BibError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid BibTeX: {0}")]
    Parse(String),
}

/// Loads and parses a BibTeX file.
pub fn load_bibliography(path: &Path) -> Result<Bibliography, BibError> {
    let content = fs::read_to_string(path)?;
    parse_bibliography(&content)
}

/// Parses literal BibTeX text.
pub fn parse_bibliography(content: &str) -> Result<Bibliography, BibError> {
    Bibliography::parse(content).map_err(|e| BibError::Parse(e.to_string()))
}

/// Returns a field's value flattened to plain text, if the field is present.
pub fn field_text(entry: &Entry, name: &str) -> Option<String> {
    entry.get(name).map(|chunks| chunks.format_verbatim())
}

/// Re-serializes a single entry to BibTeX source text.
pub fn raw_bibtex(entry: &Entry) -> String {
    entry.to_biblatex_string()
}
