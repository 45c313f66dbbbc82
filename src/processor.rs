//! Publication processing.
//!
//! This module runs one formatting pass: it formats every entry with the
//! configured style, rewrites sentinel markers into HTML, assembles the
//! published records, and groups them. Passes share no state; each call
//! builds its result from scratch.

use std::path::Path;

use biblatex::{Bibliography, ChunksExt};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use crate::bib::{self, field_text};
use crate::config::Settings;
use crate::group::{group_records, GroupingIndex};
use crate::rewrite::rewrite_markers;
use crate::style::{resolve_style, Formatter, PlainStyle, Style, StyleConfig};

/// The published unit: one formatted bibliography entry with its metadata.
///
/// Records are immutable after the pass that created them and are not cached
/// across passes.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationRecord {
    pub key: String,
    pub year: Option<String>,
    /// Rendered citation HTML, markers already rewritten to spans.
    pub text: String,
    /// The entry re-serialized as BibTeX source text.
    pub bibtex: String,
    pub pdf: Option<String>,
    pub slides: Option<String>,
    pub poster: Option<String>,
    /// All fields of the original entry, flattened to text.
    pub fields: IndexMap<String, String>,
}

impl PublicationRecord {
    /// Looks up an original field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Context representation: all original fields plus the named keys.
    /// Named keys win on collision.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), Value::String(value.clone()));
        }
        map.insert("key".to_string(), Value::String(self.key.clone()));
        map.insert("year".to_string(), opt_value(&self.year));
        map.insert("text".to_string(), Value::String(self.text.clone()));
        map.insert("bibtex".to_string(), Value::String(self.bibtex.clone()));
        map.insert("pdf".to_string(), opt_value(&self.pdf));
        map.insert("slides".to_string(), opt_value(&self.slides));
        map.insert("poster".to_string(), opt_value(&self.poster));
        Value::Object(map)
    }
}

fn opt_value(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

/// The result of one formatting pass.
#[derive(Debug, Clone, Default)]
pub struct PublicationSet {
    /// Every record, in the order the style emitted the entries.
    pub publications: Vec<PublicationRecord>,
    /// Records bucketed by the configured split field.
    pub lists: GroupingIndex,
}

/// Runs one formatting pass over an already-parsed bibliography.
///
/// An unknown custom style is reported and the default style is used
/// instead; everything else is infallible.
pub fn build_publications(bibliography: &Bibliography, settings: &Settings) -> PublicationSet {
    let style: Box<dyn Style> = match resolve_style(&settings.style) {
        Ok(style) => style,
        Err(e) => {
            warn!("{}, falling back to the plain style", e);
            let config = StyleConfig {
                name: None,
                ..settings.style.clone()
            };
            Box::new(PlainStyle::new(config))
        }
    };
    let formatter = Formatter::new(style, settings.decorate_html);

    let mut publications = Vec::new();
    for citation in formatter.format(bibliography) {
        let Some(entry) = bibliography.get(&citation.key) else {
            continue;
        };
        let fields: IndexMap<String, String> = entry
            .fields
            .iter()
            .map(|(name, chunks)| (name.clone(), chunks.format_verbatim()))
            .collect();
        publications.push(PublicationRecord {
            year: field_text(entry, "year"),
            pdf: field_text(entry, "pdf"),
            slides: field_text(entry, "slides"),
            poster: field_text(entry, "poster"),
            text: rewrite_markers(&citation.text),
            bibtex: citation.bibtex,
            key: citation.key,
            fields,
        });
    }

    let lists = group_records(
        &publications,
        settings.split_by.as_deref(),
        settings.untagged_title.as_deref(),
    );
    PublicationSet {
        publications,
        lists,
    }
}

/// Loads and processes a bibliography file.
///
/// A missing or malformed file is logged as a warning and yields `None`;
/// it never aborts the surrounding build.
pub fn publications_from_file(path: &Path, settings: &Settings) -> Option<PublicationSet> {
    match bib::load_bibliography(path) {
        Ok(bibliography) => Some(build_publications(&bibliography, settings)),
        Err(e) => {
            warn!("failed to load bibliography {}: {}", path.display(), e);
            None
        }
    }
}

/// Processes literal bibliography text, with the same non-fatal behavior as
/// [`publications_from_file`].
pub fn publications_from_str(content: &str, settings: &Settings) -> Option<PublicationSet> {
    match bib::parse_bibliography(content) {
        Ok(bibliography) => Some(build_publications(&bibliography, settings)),
        Err(e) => {
            warn!("failed to parse bibliography content: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bib::parse_bibliography;

    const THREE_ENTRIES: &str = r#"@article{A,
    author = {Doe, John},
    title = {First},
    journal = {J. One},
    year = {2019},
    tags = {ml,nlp},
    pdf = {https://example.org/a.pdf},
}
@misc{B,
    author = {Roe, Jane},
    title = {Second},
    year = {2020},
    tags = {},
}
@inproceedings{C,
    author = {Poe, Edgar},
    title = {Third},
    booktitle = {Proc. Conf.},
    year = {2021},
    tags = {ml},
    slides = {https://example.org/c-slides.pdf},
}"#;

    fn settings_with_split() -> Settings {
        Settings {
            split_by: Some("tags".to_string()),
            untagged_title: Some("Other".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_flat_list_matches_entry_count_and_order() {
        // Given: three parsed entries
        let bibliography = parse_bibliography(THREE_ENTRIES).unwrap();

        // When: we run a pass with default (file) order
        let set = build_publications(&bibliography, &settings_with_split());

        // Then: one record per entry, in file order
        assert_eq!(set.publications.len(), bibliography.len());
        let keys: Vec<&str> = set.publications.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_grouping_matches_tags() {
        let bibliography = parse_bibliography(THREE_ENTRIES).unwrap();
        let set = build_publications(&bibliography, &settings_with_split());

        let labels: Vec<&str> = set.lists.keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["ml", "nlp", "Other"]);
        let ml: Vec<&str> = set.lists["ml"].iter().map(|r| r.key.as_str()).collect();
        assert_eq!(ml, vec!["A", "C"]);
        let other: Vec<&str> = set.lists["Other"].iter().map(|r| r.key.as_str()).collect();
        assert_eq!(other, vec!["B"]);
    }

    #[test]
    fn test_record_carries_metadata_and_fields() {
        let bibliography = parse_bibliography(THREE_ENTRIES).unwrap();
        let set = build_publications(&bibliography, &settings_with_split());

        let a = &set.publications[0];
        assert_eq!(a.year.as_deref(), Some("2019"));
        assert_eq!(a.pdf.as_deref(), Some("https://example.org/a.pdf"));
        assert_eq!(a.slides, None);
        assert_eq!(a.field("journal"), Some("J. One"));
        assert!(a.bibtex.contains("First"));

        let c = &set.publications[2];
        assert_eq!(c.slides.as_deref(), Some("https://example.org/c-slides.pdf"));
    }

    #[test]
    fn test_decorated_pass_produces_spans_not_markers() {
        // Given: decoration enabled
        let settings = Settings {
            decorate_html: true,
            ..settings_with_split()
        };
        let bibliography = parse_bibliography(THREE_ENTRIES).unwrap();

        // When: we run the pass
        let set = build_publications(&bibliography, &settings);

        // Then: records carry rewritten spans, never raw markers
        let text = &set.publications[0].text;
        assert!(text.contains(r#"<span class="bib-article">"#), "got: {}", text);
        assert!(text.contains(r#"<span class="bib-title">"#), "got: {}", text);
        assert!(!text.contains("<:"), "raw markers left in: {}", text);
    }

    #[test]
    fn test_undecorated_pass_has_no_spans() {
        let bibliography = parse_bibliography(THREE_ENTRIES).unwrap();
        let set = build_publications(&bibliography, &settings_with_split());
        assert!(!set.publications[0].text.contains("<span"));
    }

    #[test]
    fn test_unknown_style_falls_back_to_plain() {
        // Given: settings naming a style that does not exist
        let settings = Settings {
            style: StyleConfig {
                name: Some("nonexistent".to_string()),
                ..StyleConfig::default()
            },
            ..Settings::default()
        };
        let bibliography = parse_bibliography(THREE_ENTRIES).unwrap();

        // When: we run the pass
        let set = build_publications(&bibliography, &settings);

        // Then: formatting still happened with the default style
        assert_eq!(set.publications.len(), 3);
        assert!(set.publications[0].text.contains("First"));
    }

    #[test]
    fn test_to_value_merges_fields_with_named_keys_winning() {
        let bibliography = parse_bibliography(THREE_ENTRIES).unwrap();
        let set = build_publications(&bibliography, &settings_with_split());

        let value = set.publications[0].to_value();
        let map = value.as_object().unwrap();
        assert_eq!(map["key"], Value::String("A".to_string()));
        assert_eq!(map["journal"], Value::String("J. One".to_string()));
        assert_eq!(map["tags"], Value::String("ml,nlp".to_string()));
        // `text` is the rendered citation, not a bibliography field
        assert!(map["text"].as_str().unwrap().contains("First"));
        assert_eq!(map["poster"], Value::Null);
    }

    #[test]
    fn test_publications_from_str_malformed_is_none() {
        let settings = Settings::default();
        assert!(publications_from_str("@article{broken,\n  title = {Unclosed\n", &settings).is_none());
    }

    #[test]
    fn test_publications_from_file_missing_is_none() {
        let settings = Settings::default();
        assert!(publications_from_file(Path::new("/nonexistent/refs.bib"), &settings).is_none());
    }
}
