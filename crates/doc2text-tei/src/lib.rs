//! Translator from GROBID TEI XML into a [`Paper`].
//!
//! GROBID's `processFulltextDocument` returns a TEI document whose header
//! carries the bibliographic metadata and abstract, whose `<body>` holds the
//! numbered section divs, and whose `<back>` holds acknowledgements, annexes,
//! and the bibliography. [`parse_tei_str`] maps that document onto the
//! paragraph/section/reference-entry model used by the flattener.

mod dom;
mod translate;

use std::path::Path;

use doc2text_core::{Paper, TEI_SUFFIX};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TeiError {
    #[error("XML error: {0}")]
    Xml(String),
    #[error("document has no root element")]
    Empty,
    #[error("not a TEI document (root element <{0}>)")]
    NotTei(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Translate a TEI document held in memory.
pub fn parse_tei_str(xml: &str, paper_id: &str) -> Result<Paper, TeiError> {
    let root = dom::parse_document(xml)?;
    if root.name != "TEI" {
        return Err(TeiError::NotTei(root.name));
    }
    Ok(translate::translate(&root, paper_id))
}

/// Read and translate a TEI file written by the service.
///
/// The paper id is the file name with the `.tei.xml` suffix removed.
pub fn parse_tei_file(path: &Path) -> Result<Paper, TeiError> {
    let xml = std::fs::read_to_string(path)?;
    let paper = parse_tei_str(&xml, &paper_id_from_tei_path(path))?;
    tracing::debug!(
        path = %path.display(),
        paragraphs = paper.body_text.len(),
        ref_entries = paper.ref_entries.len(),
        "parsed TEI file"
    );
    Ok(paper)
}

fn paper_id_from_tei_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = format!(".{}", TEI_SUFFIX);
    match name.strip_suffix(&suffix) {
        Some(stem) => stem.to_string(),
        None => doc2text_core::paper_id(path),
    }
}
