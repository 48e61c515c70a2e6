//! Serialization of a [`Paper`] into plain text.
//!
//! Two rule sets exist, selected by [`VersionTag`]:
//!
//! - [`VersionTag::Legacy`] writes the metadata lines followed by the
//!   abstract, body, and back-matter paragraphs, each preceded by its
//!   section header. Inside the body, a header identical to the previous
//!   one is not repeated.
//! - [`VersionTag::Reference`] writes only the reference entries.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::paper::{Paper, Paragraph, RefEntry};

/// Separator placed between section labels in a header.
pub const SECTION_SEPARATOR: &str = "::";

/// Identifies which service pass produced a paper and how it is flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionTag {
    /// Full-text pass (GROBID 0.6.1 style): metadata, abstract, body, back matter.
    Legacy,
    /// Reference pass (GROBID 0.7.1): reference entries only.
    Reference,
}

impl VersionTag {
    /// Both tags, in the order the orchestrator runs them.
    pub const ALL: [VersionTag; 2] = [VersionTag::Legacy, VersionTag::Reference];

    /// The service version literal this tag stands for.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionTag::Legacy => "v_0.6.1",
            VersionTag::Reference => "v_0.7.1",
        }
    }

    /// Short name used in file names and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            VersionTag::Legacy => "legacy",
            VersionTag::Reference => "reference",
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionTag::ALL
            .into_iter()
            .find(|tag| tag.slug().eq_ignore_ascii_case(s) || tag.as_str() == s)
            .ok_or_else(|| format!("unknown version tag: {s} (expected legacy or reference)"))
    }
}

/// The part of a paper a malformed item was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Abstract,
    BodyText,
    BackMatter,
    RefEntries,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Block::Abstract => "abstract",
            Block::BodyText => "body_text",
            Block::BackMatter => "back_matter",
            Block::RefEntries => "ref_entries",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    #[error("{block} item {index} has no {field}")]
    MissingField {
        block: Block,
        index: usize,
        field: &'static str,
    },
}

/// Header emission policy for a block of paragraphs.
#[derive(Clone, Copy)]
enum Headers {
    /// Every paragraph gets its header.
    Always,
    /// A header equal to the previous paragraph's is skipped.
    SkipRepeats,
}

/// Flatten `paper` into text using the rules for `tag`.
pub fn flatten(paper: &Paper, tag: VersionTag) -> Result<String, FlattenError> {
    let mut out = String::new();
    match tag {
        VersionTag::Legacy => {
            write_metadata(&mut out, paper);
            write_paragraphs(&mut out, &paper.abstract_text, Block::Abstract, Headers::Always)?;
            write_paragraphs(&mut out, &paper.body_text, Block::BodyText, Headers::SkipRepeats)?;
            write_paragraphs(&mut out, &paper.back_matter, Block::BackMatter, Headers::Always)?;
        }
        VersionTag::Reference => write_ref_entries(&mut out, &paper.ref_entries)?,
    }
    Ok(out)
}

fn write_metadata(out: &mut String, paper: &Paper) {
    let metadata = &paper.metadata;
    for value in [&metadata.title, &metadata.year, &metadata.venue]
        .into_iter()
        .flatten()
    {
        push_line(out, value);
    }
}

fn write_paragraphs(
    out: &mut String,
    paragraphs: &[Paragraph],
    block: Block,
    headers: Headers,
) -> Result<(), FlattenError> {
    let mut previous: Option<String> = None;
    for (index, para) in paragraphs.iter().enumerate() {
        let text = para.text.as_deref().ok_or(FlattenError::MissingField {
            block,
            index,
            field: "text",
        })?;
        let header = para.header();
        let repeated = matches!(headers, Headers::SkipRepeats)
            && previous.as_deref() == Some(header.as_str());
        if !repeated {
            out.push('\n');
            push_line(out, &header);
        }
        push_line(out, text);
        previous = Some(header);
    }
    Ok(())
}

fn write_ref_entries(out: &mut String, entries: &[RefEntry]) -> Result<(), FlattenError> {
    for (index, entry) in entries.iter().enumerate() {
        let field = |value: &Option<String>, field: &'static str| {
            value.clone().ok_or(FlattenError::MissingField {
                block: Block::RefEntries,
                index,
                field,
            })
        };
        let type_str = field(&entry.type_str, "type_str")?;
        let text = field(&entry.text, "text")?;
        let content = field(&entry.content, "content")?;

        out.push('\n');
        push_line(out, &type_str.to_uppercase());
        push_line(out, &text);
        push_line(out, &content);
    }
    Ok(())
}

fn push_line(out: &mut String, value: &str) {
    out.push_str(value);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{Metadata, SectionHeading};

    fn section(labels: &[&str]) -> Vec<SectionHeading> {
        labels.iter().map(|l| SectionHeading::new(None, *l)).collect()
    }

    fn para(text: &str, labels: &[&str]) -> Paragraph {
        Paragraph::new(text, section(labels))
    }

    #[test]
    fn empty_paper_flattens_to_nothing() {
        let paper = Paper::new("empty");
        assert_eq!(flatten(&paper, VersionTag::Legacy).unwrap(), "");
        assert_eq!(flatten(&paper, VersionTag::Reference).unwrap(), "");
    }

    #[test]
    fn metadata_skips_absent_fields() {
        let mut paper = Paper::new("p");
        paper.metadata = Metadata {
            title: Some("Foo".into()),
            year: None,
            venue: Some("Bar".into()),
        };
        paper.body_text = vec![para("Hi", &[])];

        let text = flatten(&paper, VersionTag::Legacy).unwrap();
        assert_eq!(text, "Foo\nBar\n\n\nHi\n");
    }

    #[test]
    fn body_suppresses_repeated_header() {
        let mut paper = Paper::new("p");
        paper.body_text = vec![
            para("first", &["Intro"]),
            para("second", &["Intro"]),
            para("third", &["Intro"]),
        ];

        let text = flatten(&paper, VersionTag::Legacy).unwrap();
        assert_eq!(text, "\nIntro\nfirst\nsecond\nthird\n");
        assert_eq!(text.matches("Intro").count(), 1);
    }

    #[test]
    fn body_emits_each_changed_header_once() {
        let mut paper = Paper::new("p");
        paper.body_text = vec![
            para("a", &["Intro"]),
            para("b", &["Method", "Data"]),
            para("c", &["Intro"]),
        ];

        let text = flatten(&paper, VersionTag::Legacy).unwrap();
        assert_eq!(text, "\nIntro\na\n\nMethod::Data\nb\n\nIntro\nc\n");
    }

    #[test]
    fn body_first_paragraph_with_empty_path_still_gets_header() {
        let mut paper = Paper::new("p");
        paper.body_text = vec![para("a", &[]), para("b", &[])];

        let text = flatten(&paper, VersionTag::Legacy).unwrap();
        assert_eq!(text, "\n\na\nb\n");
    }

    #[test]
    fn abstract_and_back_matter_repeat_headers() {
        let mut paper = Paper::new("p");
        paper.abstract_text = vec![para("a1", &["Abstract"]), para("a2", &["Abstract"])];
        paper.back_matter = vec![
            para("k1", &["Acknowledgements"]),
            para("k2", &["Acknowledgements"]),
        ];

        let text = flatten(&paper, VersionTag::Legacy).unwrap();
        assert_eq!(
            text,
            "\nAbstract\na1\n\nAbstract\na2\n\nAcknowledgements\nk1\n\nAcknowledgements\nk2\n"
        );
    }

    #[test]
    fn legacy_ignores_reference_entries() {
        let mut paper = Paper::new("p");
        paper.ref_entries = vec![RefEntry::new("b0", "bibref", "t", "c")];
        assert_eq!(flatten(&paper, VersionTag::Legacy).unwrap(), "");
    }

    #[test]
    fn reference_pass_writes_entries_only() {
        let mut paper = Paper::new("p");
        paper.metadata.title = Some("Ignored".into());
        paper.body_text = vec![para("ignored", &["Intro"])];
        paper.ref_entries = vec![RefEntry::new("r0", "background", "see X", "X et al.")];

        let text = flatten(&paper, VersionTag::Reference).unwrap();
        assert_eq!(text, "\nBACKGROUND\nsee X\nX et al.\n");
    }

    #[test]
    fn reference_entries_keep_collection_order() {
        let mut paper = Paper::new("p");
        paper.ref_entries = vec![
            RefEntry::new("fig_0", "figure", "A plot", "Figure 1"),
            RefEntry::new("b0", "bibref", "Some title", "Raw citation"),
        ];

        let text = flatten(&paper, VersionTag::Reference).unwrap();
        assert_eq!(
            text,
            "\nFIGURE\nA plot\nFigure 1\n\nBIBREF\nSome title\nRaw citation\n"
        );
    }

    #[test]
    fn missing_paragraph_text_is_an_error() {
        let mut paper = Paper::new("p");
        paper.body_text = vec![
            para("ok", &[]),
            Paragraph {
                text: None,
                section: vec![],
            },
        ];

        let err = flatten(&paper, VersionTag::Legacy).unwrap_err();
        assert_eq!(
            err,
            FlattenError::MissingField {
                block: Block::BodyText,
                index: 1,
                field: "text",
            }
        );
        assert_eq!(err.to_string(), "body_text item 1 has no text");
    }

    #[test]
    fn missing_reference_content_is_an_error() {
        let mut paper = Paper::new("p");
        let mut entry = RefEntry::new("b0", "bibref", "t", "c");
        entry.content = None;
        paper.ref_entries = vec![entry];

        let err = flatten(&paper, VersionTag::Reference).unwrap_err();
        assert!(matches!(
            err,
            FlattenError::MissingField {
                block: Block::RefEntries,
                field: "content",
                ..
            }
        ));
    }

    #[test]
    fn flatten_is_deterministic() {
        let mut paper = Paper::new("p");
        paper.metadata.title = Some("T".into());
        paper.body_text = vec![para("a", &["S"]), para("b", &["S"])];
        paper.ref_entries = vec![RefEntry::new("b0", "bibref", "t", "c")];

        for tag in VersionTag::ALL {
            let first = flatten(&paper, tag).unwrap();
            let second = flatten(&paper.clone(), tag).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn version_tag_parses_slug_and_literal() {
        assert_eq!("legacy".parse::<VersionTag>().unwrap(), VersionTag::Legacy);
        assert_eq!("v_0.7.1".parse::<VersionTag>().unwrap(), VersionTag::Reference);
        assert!("v_0.8.0".parse::<VersionTag>().is_err());
        assert_eq!(VersionTag::Legacy.to_string(), "v_0.6.1");
    }
}
