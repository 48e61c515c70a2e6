use std::collections::HashMap;

use doc2text_core::{Metadata, Paper, Paragraph, RefEntry, SectionHeading};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::Element;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Map a TEI root element onto a [`Paper`].
pub(crate) fn translate(root: &Element, paper_id: &str) -> Paper {
    let header = root.child("teiHeader");
    let text = root.child("text");
    let body = text.and_then(|t| t.child("body"));
    let back = text.and_then(|t| t.child("back"));

    Paper {
        paper_id: paper_id.to_string(),
        metadata: header.map(metadata).unwrap_or_default(),
        abstract_text: header.map(abstract_paragraphs).unwrap_or_default(),
        body_text: body
            .map(|b| section_paragraphs(b.elements()))
            .unwrap_or_default(),
        back_matter: back
            .map(|b| section_paragraphs(b.elements().filter(|e| !is_references_div(e))))
            .unwrap_or_default(),
        ref_entries: text.map(ref_entries).unwrap_or_default(),
    }
}

fn clean(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn element_text(e: &Element) -> String {
    clean(&e.text())
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn child_text(parent: Option<&Element>, name: &str) -> Option<String> {
    parent
        .and_then(|p| p.child(name))
        .map(element_text)
        .and_then(non_empty)
}

fn metadata(header: &Element) -> Metadata {
    let file_desc = header.child("fileDesc");
    let source = file_desc.and_then(|f| f.child("sourceDesc"));
    let publication = file_desc.and_then(|f| f.child("publicationStmt"));

    Metadata {
        title: child_text(file_desc.and_then(|f| f.child("titleStmt")), "title"),
        year: [source, publication].into_iter().flatten().find_map(first_year),
        venue: child_text(source.and_then(|s| s.descendant("monogr")), "title"),
    }
}

/// Year of the first dated element below `scope` (`when="2019-06-01"` → `2019`).
fn first_year(scope: &Element) -> Option<String> {
    scope
        .descendants("date")
        .into_iter()
        .filter_map(|d| d.attr("when"))
        .map(|when| when.trim().chars().take(4).collect::<String>())
        .find(|year| !year.is_empty())
}

fn heading(head: &Element) -> SectionHeading {
    let number = head
        .attr("n")
        .map(str::trim)
        .filter(|n| !n.is_empty());
    SectionHeading::new(number, element_text(head))
}

fn push_paragraph(out: &mut Vec<Paragraph>, p: &Element, section: &[SectionHeading]) {
    let text = element_text(p);
    if !text.is_empty() {
        out.push(Paragraph::new(text, section.to_vec()));
    }
}

fn abstract_paragraphs(header: &Element) -> Vec<Paragraph> {
    let Some(abstract_el) = header
        .child("profileDesc")
        .and_then(|p| p.child("abstract"))
    else {
        return Vec::new();
    };

    let default_section = vec![SectionHeading::new(None, "Abstract")];
    let mut paragraphs = Vec::new();
    for child in abstract_el.elements() {
        match child.name.as_str() {
            "p" => push_paragraph(&mut paragraphs, child, &default_section),
            "div" => {
                let section = child
                    .child("head")
                    .map(heading)
                    .filter(|h| !h.label.is_empty())
                    .map(|h| vec![h])
                    .unwrap_or_else(|| default_section.clone());
                for p in child.elements().filter(|e| e.name == "p") {
                    push_paragraph(&mut paragraphs, p, &section);
                }
            }
            _ => {}
        }
    }
    paragraphs
}

/// Numbered headings seen so far, used to rebuild the outline from flat divs.
#[derive(Default)]
struct Outline {
    numbered: HashMap<String, SectionHeading>,
}

impl Outline {
    /// Section path for a new heading. A heading numbered `2.1` is prefixed
    /// by the headings numbered `2` (and so on up) when those were seen.
    fn path_for(&mut self, heading: SectionHeading) -> Vec<SectionHeading> {
        let Some(number) = heading.number.clone() else {
            if heading.label.is_empty() {
                return Vec::new();
            }
            return vec![heading];
        };

        let key = number.trim_end_matches('.').to_string();
        let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
        let mut path: Vec<SectionHeading> = (1..parts.len())
            .filter_map(|i| self.numbered.get(&parts[..i].join(".")).cloned())
            .collect();
        path.push(heading.clone());
        self.numbered.insert(key, heading);
        path
    }
}

fn section_paragraphs<'a>(elements: impl Iterator<Item = &'a Element>) -> Vec<Paragraph> {
    let mut outline = Outline::default();
    let mut paragraphs = Vec::new();
    for el in elements {
        match el.name.as_str() {
            "div" => walk_div(el, &mut outline, &mut paragraphs),
            "p" => push_paragraph(&mut paragraphs, el, &[]),
            _ => {}
        }
    }
    paragraphs
}

fn walk_div(div: &Element, outline: &mut Outline, out: &mut Vec<Paragraph>) {
    let section = div
        .child("head")
        .map(|h| outline.path_for(heading(h)))
        .unwrap_or_default();
    for child in div.elements() {
        match child.name.as_str() {
            "p" => push_paragraph(out, child, &section),
            "div" => walk_div(child, outline, out),
            _ => {}
        }
    }
}

fn is_references_div(e: &Element) -> bool {
    e.name == "div" && e.attr("type") == Some("references")
}

fn ref_entries(text: &Element) -> Vec<RefEntry> {
    let mut entries: Vec<RefEntry> = text
        .descendants("figure")
        .into_iter()
        .enumerate()
        .map(|(i, figure)| figure_entry(figure, i))
        .collect();

    let bibls = text
        .descendants("listBibl")
        .into_iter()
        .flat_map(|list| list.elements().filter(|e| e.name == "biblStruct"));
    entries.extend(bibls.enumerate().map(|(i, bibl)| bib_entry(bibl, i)));
    entries
}

fn figure_entry(figure: &Element, index: usize) -> RefEntry {
    let is_table = figure.attr("type") == Some("table");
    let (type_str, id_prefix) = if is_table {
        ("table", "tab")
    } else {
        ("figure", "fig")
    };
    let ref_id = figure
        .attr("xml:id")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{id_prefix}_{index}"));
    let caption = figure.child("figDesc").map(element_text).unwrap_or_default();
    let head = figure.child("head").map(element_text).unwrap_or_default();

    let content = if is_table {
        figure
            .child("table")
            .map(table_content)
            .and_then(non_empty)
            .unwrap_or(head)
    } else {
        head
    };

    RefEntry::new(ref_id, type_str, caption, content)
}

/// Table rows, one per line, cells separated by ` | `.
fn table_content(table: &Element) -> String {
    table
        .descendants("row")
        .into_iter()
        .map(|row| {
            row.elements()
                .filter(|e| e.name == "cell")
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bib_entry(bibl: &Element, index: usize) -> RefEntry {
    let ref_id = bibl
        .attr("xml:id")
        .map(str::to_string)
        .unwrap_or_else(|| format!("b{index}"));
    let analytic = bibl.child("analytic");
    let monogr = bibl.child("monogr");

    let analytic_title = child_text(analytic, "title");
    let monogr_title = child_text(monogr, "title");
    let raw = bibl
        .elements()
        .find(|e| e.name == "note" && e.attr("type") == Some("raw_reference"))
        .map(element_text)
        .and_then(non_empty);

    // With an analytic title, the monograph title is the venue
    let (title, venue) = match analytic_title {
        Some(t) => (Some(t), monogr_title),
        None => (monogr_title, None),
    };

    let content = match &raw {
        Some(r) => r.clone(),
        None => compose_citation(analytic.or(monogr), title.as_deref(), venue.as_deref(), monogr),
    };
    let text = title.or(raw).unwrap_or_default();

    RefEntry::new(ref_id, "bibref", text, content)
}

/// `Authors. Title. Venue. Year` from whichever parts are present.
fn compose_citation(
    author_scope: Option<&Element>,
    title: Option<&str>,
    venue: Option<&str>,
    monogr: Option<&Element>,
) -> String {
    let authors = author_scope
        .map(|scope| {
            scope
                .elements()
                .filter(|e| e.name == "author")
                .filter_map(|a| a.child("persName"))
                .map(person_name)
                .filter(|n| !n.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let year = monogr.and_then(first_year);

    [Some(authors.as_str()), title, venue, year.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(". ")
}

fn person_name(pers: &Element) -> String {
    pers.elements()
        .filter(|e| e.name == "forename" || e.name == "surname")
        .map(element_text)
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xml:space="preserve" xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader xml:lang="en">
    <fileDesc>
      <titleStmt>
        <title level="a" type="main">Attention   Is All
          You Need</title>
      </titleStmt>
      <publicationStmt>
        <publisher/>
        <availability status="unknown"><licence/></availability>
      </publicationStmt>
      <sourceDesc>
        <biblStruct>
          <analytic>
            <author><persName><forename type="first">Ashish</forename><surname>Vaswani</surname></persName></author>
            <title level="a" type="main">Attention Is All You Need</title>
          </analytic>
          <monogr>
            <title level="m">Advances in Neural Information Processing Systems</title>
            <imprint><date type="published" when="2017-12-04">2017</date></imprint>
          </monogr>
        </biblStruct>
      </sourceDesc>
    </fileDesc>
    <profileDesc>
      <abstract>
        <div xmlns="http://www.tei-c.org/ns/1.0"><p>The dominant sequence transduction models.</p><p>We propose the Transformer.</p></div>
      </abstract>
    </profileDesc>
  </teiHeader>
  <text xml:lang="en">
    <body>
      <div xmlns="http://www.tei-c.org/ns/1.0"><head n="1">Introduction</head><p>Recurrent neural networks <ref type="bibr" target="#b0">[1]</ref> are used.</p><p>Second intro paragraph.</p></div>
      <div xmlns="http://www.tei-c.org/ns/1.0"><head n="2">Background</head><p>Background text.</p></div>
      <div xmlns="http://www.tei-c.org/ns/1.0"><head n="2.1">Self-Attention</head><p>Self-attention text.</p></div>
      <div xmlns="http://www.tei-c.org/ns/1.0"><p>Headless paragraph.</p></div>
      <figure xmlns="http://www.tei-c.org/ns/1.0" xml:id="fig_0"><head>Figure 1 :</head><figDesc>The Transformer architecture.</figDesc></figure>
      <figure xmlns="http://www.tei-c.org/ns/1.0" type="table" xml:id="tab_0"><head>Table 1 :</head><figDesc>BLEU scores.</figDesc><table><row><cell>Model</cell><cell>BLEU</cell></row><row><cell>Transformer</cell><cell>28.4</cell></row></table></figure>
    </body>
    <back>
      <div type="acknowledgement">
        <div xmlns="http://www.tei-c.org/ns/1.0"><head>Acknowledgements</head><p>We thank the reviewers.</p></div>
      </div>
      <div type="references">
        <listBibl>
          <biblStruct xml:id="b0">
            <analytic>
              <title level="a" type="main">Long short-term memory</title>
              <author><persName><forename type="first">Sepp</forename><surname>Hochreiter</surname></persName></author>
            </analytic>
            <monogr>
              <title level="j">Neural Computation</title>
              <imprint><date type="published" when="1997">1997</date></imprint>
            </monogr>
            <note type="raw_reference">Sepp Hochreiter and Jürgen Schmidhuber. Long short-term memory. Neural computation, 1997.</note>
          </biblStruct>
          <biblStruct xml:id="b1">
            <analytic>
              <title level="a" type="main">Neural machine translation</title>
              <author><persName><forename type="first">Dzmitry</forename><surname>Bahdanau</surname></persName></author>
            </analytic>
            <monogr>
              <title level="m">ICLR</title>
              <imprint><date type="published" when="2015">2015</date></imprint>
            </monogr>
          </biblStruct>
        </listBibl>
      </div>
    </back>
  </text>
</TEI>"##;

    fn sample_paper() -> Paper {
        let root = parse_document(SAMPLE).unwrap();
        translate(&root, "attention")
    }

    fn labels(para: &Paragraph) -> Vec<&str> {
        para.section.iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn metadata_from_header() {
        let paper = sample_paper();
        assert_eq!(paper.paper_id, "attention");
        assert_eq!(
            paper.metadata.title.as_deref(),
            Some("Attention Is All You Need")
        );
        assert_eq!(paper.metadata.year.as_deref(), Some("2017"));
        assert_eq!(
            paper.metadata.venue.as_deref(),
            Some("Advances in Neural Information Processing Systems")
        );
    }

    #[test]
    fn abstract_paragraphs_default_to_abstract_section() {
        let paper = sample_paper();
        assert_eq!(paper.abstract_text.len(), 2);
        assert_eq!(labels(&paper.abstract_text[0]), vec!["Abstract"]);
        assert_eq!(
            paper.abstract_text[1].text.as_deref(),
            Some("We propose the Transformer.")
        );
    }

    #[test]
    fn body_paragraphs_carry_hierarchical_paths() {
        let paper = sample_paper();
        let body = &paper.body_text;
        assert_eq!(body.len(), 5);

        assert_eq!(
            body[0].text.as_deref(),
            Some("Recurrent neural networks [1] are used.")
        );
        assert_eq!(labels(&body[0]), vec!["Introduction"]);
        assert_eq!(body[0].section[0].number.as_deref(), Some("1"));
        assert_eq!(labels(&body[1]), vec!["Introduction"]);
        assert_eq!(labels(&body[2]), vec!["Background"]);
        assert_eq!(labels(&body[3]), vec!["Background", "Self-Attention"]);
        assert!(body[4].section.is_empty());
    }

    #[test]
    fn back_matter_excludes_bibliography() {
        let paper = sample_paper();
        assert_eq!(paper.back_matter.len(), 1);
        assert_eq!(labels(&paper.back_matter[0]), vec!["Acknowledgements"]);
        assert_eq!(
            paper.back_matter[0].text.as_deref(),
            Some("We thank the reviewers.")
        );
    }

    #[test]
    fn ref_entries_list_figures_then_bibliography() {
        let paper = sample_paper();
        let kinds: Vec<&str> = paper
            .ref_entries
            .iter()
            .map(|e| e.type_str.as_deref().unwrap())
            .collect();
        assert_eq!(kinds, vec!["figure", "table", "bibref", "bibref"]);

        let figure = &paper.ref_entries[0];
        assert_eq!(figure.ref_id, "fig_0");
        assert_eq!(figure.text.as_deref(), Some("The Transformer architecture."));
        assert_eq!(figure.content.as_deref(), Some("Figure 1 :"));

        let table = &paper.ref_entries[1];
        assert_eq!(
            table.content.as_deref(),
            Some("Model | BLEU\nTransformer | 28.4")
        );
    }

    #[test]
    fn bibref_prefers_raw_reference_for_content() {
        let paper = sample_paper();
        let b0 = &paper.ref_entries[2];
        assert_eq!(b0.ref_id, "b0");
        assert_eq!(b0.text.as_deref(), Some("Long short-term memory"));
        assert!(b0.content.as_deref().unwrap().starts_with("Sepp Hochreiter and"));
    }

    #[test]
    fn bibref_without_raw_reference_is_composed() {
        let paper = sample_paper();
        let b1 = &paper.ref_entries[3];
        assert_eq!(
            b1.content.as_deref(),
            Some("Dzmitry Bahdanau. Neural machine translation. ICLR. 2015")
        );
    }

    #[test]
    fn outline_links_only_seen_parents() {
        let mut outline = Outline::default();
        let orphan = outline.path_for(SectionHeading::new(Some("3.2"), "Orphan"));
        assert_eq!(orphan.len(), 1);

        outline.path_for(SectionHeading::new(Some("4."), "Results"));
        outline.path_for(SectionHeading::new(Some("4.1"), "Setup"));
        let deep = outline.path_for(SectionHeading::new(Some("4.1.2"), "Hardware"));
        let deep_labels: Vec<&str> = deep.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(deep_labels, vec!["Results", "Setup", "Hardware"]);
    }

    #[test]
    fn minimal_document_yields_empty_paper() {
        let root = parse_document(r#"<TEI><teiHeader/><text><body/></text></TEI>"#).unwrap();
        let paper = translate(&root, "empty");
        assert_eq!(paper.metadata, Metadata::default());
        assert!(paper.abstract_text.is_empty());
        assert!(paper.body_text.is_empty());
        assert!(paper.ref_entries.is_empty());
    }
}
