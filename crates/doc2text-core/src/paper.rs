use serde::{Deserialize, Serialize};

use crate::flatten::SECTION_SEPARATOR;

/// Bibliographic header of a paper. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub year: Option<String>,
    pub venue: Option<String>,
}

/// One component of a paragraph's section path, e.g. `("2.1", "Datasets")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeading {
    /// Section number as printed in the document (`n` attribute of `<head>`).
    pub number: Option<String>,
    /// Human-readable label used when rendering headers.
    pub label: String,
}

impl SectionHeading {
    pub fn new(number: Option<&str>, label: impl Into<String>) -> Self {
        Self {
            number: number.map(str::to_string),
            label: label.into(),
        }
    }
}

/// A unit of abstract, body, or back-matter text.
///
/// `text` is optional only so that malformed input can be detected by the
/// flattener; the TEI translator always fills it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: Option<String>,
    #[serde(default)]
    pub section: Vec<SectionHeading>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, section: Vec<SectionHeading>) -> Self {
        Self {
            text: Some(text.into()),
            section,
        }
    }

    /// Section labels joined with `::`. Empty for root-level text.
    pub fn header(&self) -> String {
        self.section
            .iter()
            .map(|s| s.label.as_str())
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR)
    }
}

/// A figure, table, or bibliography record attached to a paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefEntry {
    pub ref_id: String,
    /// Category label (`figure`, `table`, `bibref`, ...).
    pub type_str: Option<String>,
    /// Display text: a caption or a cited title.
    pub text: Option<String>,
    /// Raw content: table cells or the raw citation string.
    pub content: Option<String>,
}

impl RefEntry {
    pub fn new(
        ref_id: impl Into<String>,
        type_str: impl Into<String>,
        text: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            ref_id: ref_id.into(),
            type_str: Some(type_str.into()),
            text: Some(text.into()),
            content: Some(content.into()),
        }
    }
}

/// Structured representation of one PDF as returned by one service pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Vec<Paragraph>,
    #[serde(default)]
    pub body_text: Vec<Paragraph>,
    #[serde(default)]
    pub back_matter: Vec<Paragraph>,
    #[serde(default)]
    pub ref_entries: Vec<RefEntry>,
}

impl Paper {
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            ..Self::default()
        }
    }
}
