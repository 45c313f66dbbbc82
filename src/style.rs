//! Citation styles.
//!
//! A style turns parsed entries into renderable [`Markup`], controlling
//! sorting, name display, and the per-entry-type citation layout. The
//! [`Formatter`] composes a style with the optional sentinel decoration at
//! construction time; decoration never changes the rendered text, it only
//! brackets structural pieces with markers for the rewriter.

use biblatex::{Bibliography, Entry, Person};
use serde::Deserialize;
use thiserror::Error;

use crate::bib::{field_text, raw_bibtex};
use crate::markup::Markup;

/// Errors that can occur when selecting a style.
#[derive(Error, Debug)]
pub enum StyleError {
    #[error("unknown citation style '{0}'")]
    Unknown(String),
}

/// Entry order applied by a style before formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Keep bibliography file order.
    #[default]
    None,
    /// Sort by citation key.
    Key,
    /// Oldest first.
    Year,
    /// Newest first.
    YearDesc,
}

/// How a person's name is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameOrder {
    /// "John Doe"
    #[default]
    GivenFamily,
    /// "Doe, John"
    FamilyGiven,
}

/// Style configuration forwarded to the citation style.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct StyleConfig {
    /// Style name; `None` selects the default plain style.
    pub name: Option<String>,
    pub sort: SortOrder,
    /// Abbreviate given names to initials.
    pub abbreviate_names: bool,
    pub name_order: NameOrder,
}

/// The style capability: format entries into renderable markup.
///
/// Output order is style-determined (a style may sort the entries it was
/// given); each pair carries the entry's citation key.
pub trait Style {
    fn format_entries<'a>(&self, entries: Vec<&'a Entry>) -> Vec<(String, Markup)>;
}

/// Single source of truth for the builtin style names.
const BUILTIN_STYLES: &[&str] = &["plain", "abbrv"];

/// Returns the list of builtin style names.
pub fn builtin_style_names() -> Vec<&'static str> {
    BUILTIN_STYLES.to_vec()
}

/// Resolves the configured style.
///
/// An unrecognized style name is a configuration error and is reported
/// before any formatting happens; callers decide whether to fall back to
/// the default style.
pub fn resolve_style(config: &StyleConfig) -> Result<Box<dyn Style>, StyleError> {
    match config.name.as_deref() {
        None | Some("plain") => Ok(Box::new(PlainStyle::new(config.clone()))),
        Some("abbrv") => {
            // plain with initials, like the classic BibTeX pairing
            let mut config = config.clone();
            config.abbreviate_names = true;
            Ok(Box::new(PlainStyle::new(config)))
        }
        Some(other) => Err(StyleError::Unknown(other.to_string())),
    }
}

/// A formatted citation produced by a [`Formatter`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedCitation {
    pub key: String,
    /// Rendered citation markup; carries sentinel markers when decoration
    /// is enabled.
    pub text: String,
    /// The entry re-serialized as BibTeX source text.
    pub bibtex: String,
}

/// Formats a bibliography with a style, optionally decorating structural
/// pieces with sentinel markers.
pub struct Formatter {
    style: Box<dyn Style>,
    decorate: bool,
}

impl Formatter {
    pub fn new(style: Box<dyn Style>, decorate: bool) -> Self {
        Self { style, decorate }
    }

    /// Formats every entry, in the order the style emits them.
    pub fn format(&self, bibliography: &Bibliography) -> Vec<FormattedCitation> {
        let entries: Vec<&Entry> = bibliography.iter().collect();
        self.style
            .format_entries(entries)
            .into_iter()
            .filter_map(|(key, markup)| {
                let entry = bibliography.get(&key)?;
                Some(FormattedCitation {
                    text: markup.render(self.decorate),
                    bibtex: raw_bibtex(entry),
                    key,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Plain style
// ---------------------------------------------------------------------------

/// The builtin default style: author list, title, venue, trailing web
/// references, one sentence each.
pub struct PlainStyle {
    config: StyleConfig,
}

impl PlainStyle {
    pub fn new(config: StyleConfig) -> Self {
        Self { config }
    }

    fn sort_entries(&self, entries: &mut Vec<&Entry>) {
        match self.config.sort {
            SortOrder::None => {}
            SortOrder::Key => entries.sort_by(|a, b| a.key.cmp(&b.key)),
            SortOrder::Year => entries.sort_by_key(|e| numeric_year(e)),
            SortOrder::YearDesc => entries.sort_by_key(|e| std::cmp::Reverse(numeric_year(e))),
        }
    }

    fn format_person(&self, person: &Person) -> String {
        let given = if self.config.abbreviate_names {
            abbreviate(&person.given_name)
        } else {
            person.given_name.clone()
        };
        let family = join_words(&[
            person.prefix.as_str(),
            person.name.as_str(),
            person.suffix.as_str(),
        ]);
        match self.config.name_order {
            NameOrder::GivenFamily => join_words(&[given.as_str(), family.as_str()]),
            NameOrder::FamilyGiven => {
                if given.is_empty() {
                    family
                } else {
                    format!("{}, {}", family, given)
                }
            }
        }
    }

    fn format_name_list(&self, people: &[Person]) -> String {
        let names: Vec<String> = people.iter().map(|p| self.format_person(p)).collect();
        match names.len() {
            0 => String::new(),
            1 => names[0].clone(),
            2 => format!("{} and {}", names[0], names[1]),
            n => format!("{}, and {}", names[..n - 1].join(", "), names[n - 1]),
        }
    }

    fn names(&self, entry: &Entry, field: &str) -> Markup {
        let people = persons(entry, field);
        if people.is_empty() {
            return Markup::empty();
        }
        Markup::tagged("bib-names", Markup::text(self.format_name_list(&people)))
    }

    fn editor(&self, entry: &Entry) -> Markup {
        let people = persons(entry, "editor");
        if people.is_empty() {
            return Markup::empty();
        }
        let role = if people.len() > 1 { ", editors" } else { ", editor" };
        Markup::tagged(
            "bib-editor",
            Markup::Seq(vec![
                Markup::tagged("bib-names", Markup::text(self.format_name_list(&people))),
                Markup::text(role),
            ]),
        )
    }

    fn author_or_editor(&self, entry: &Entry) -> Markup {
        let authors = self.names(entry, "author");
        let inner = if authors.is_empty() {
            self.editor(entry)
        } else {
            authors
        };
        if inner.is_empty() {
            return Markup::empty();
        }
        Markup::tagged("bib-author_or_editor", inner)
    }

    fn title(&self, entry: &Entry) -> Markup {
        match field_text(entry, "title") {
            Some(title) => Markup::tagged("bib-title", Markup::text(title)),
            None => Markup::empty(),
        }
    }

    /// Book-level title, emphasized.
    fn btitle(&self, entry: &Entry, field: &str) -> Markup {
        match field_text(entry, field) {
            Some(title) => Markup::tagged("bib-btitle", Markup::emph(Markup::text(title))),
            None => Markup::empty(),
        }
    }

    fn volume_and_series(&self, entry: &Entry) -> Markup {
        let volume = field_text(entry, "volume");
        let series = field_text(entry, "series");
        let text = match (volume, series) {
            (Some(v), Some(s)) => format!("volume {} of {}", v, s),
            (Some(v), None) => format!("volume {}", v),
            (None, Some(s)) => s,
            (None, None) => return Markup::empty(),
        };
        Markup::tagged("bib-volume_and_series", Markup::text(text))
    }

    fn chapter_and_pages(&self, entry: &Entry) -> Markup {
        let chapter = field_text(entry, "chapter").map(|c| format!("chapter {}", c));
        let pages = field_text(entry, "pages").map(|p| format!("pages {}", normalize_pages(&p)));
        let text = match (chapter, pages) {
            (Some(c), Some(p)) => format!("{}, {}", c, p),
            (Some(c), None) => c,
            (None, Some(p)) => p,
            (None, None) => return Markup::empty(),
        };
        Markup::tagged("bib-chapter_and_pages", Markup::text(text))
    }

    fn edition(&self, entry: &Entry) -> Markup {
        match field_text(entry, "edition") {
            Some(edition) => {
                Markup::tagged("bib-edition", Markup::text(format!("{} edition", edition)))
            }
            None => Markup::empty(),
        }
    }

    /// Trailing URL, DOI, eprint, ISBN, and PubMed references.
    fn web_refs(&self, entry: &Entry) -> Markup {
        let mut refs = Vec::new();
        if let Some(url) = field_text(entry, "url") {
            refs.push(Markup::tagged(
                "bib-url",
                Markup::link(url.clone(), Markup::text(format!("URL {}", url))),
            ));
        }
        if let Some(doi) = field_text(entry, "doi") {
            refs.push(Markup::tagged(
                "bib-doi",
                Markup::link(
                    format!("https://doi.org/{}", doi),
                    Markup::text(format!("doi:{}", doi)),
                ),
            ));
        }
        if let Some(eprint) = field_text(entry, "eprint") {
            refs.push(Markup::tagged(
                "bib-eprint",
                Markup::link(
                    format!("https://arxiv.org/abs/{}", eprint),
                    Markup::text(format!("arXiv:{}", eprint)),
                ),
            ));
        }
        if let Some(isbn) = field_text(entry, "isbn") {
            refs.push(Markup::tagged(
                "bib-isbn",
                Markup::text(format!("ISBN {}", isbn)),
            ));
        }
        if let Some(pmid) = field_text(entry, "pubmed") {
            refs.push(Markup::tagged(
                "bib-pubmed",
                Markup::link(
                    format!("https://www.ncbi.nlm.nih.gov/pubmed/{}", pmid),
                    Markup::text(format!("PMID:{}", pmid)),
                ),
            ));
        }
        if refs.is_empty() {
            return Markup::empty();
        }
        Markup::tagged("bib-web_refs", Markup::join(refs, ", "))
    }

    fn field(&self, entry: &Entry, name: &str) -> Markup {
        match field_text(entry, name) {
            Some(value) => Markup::text(value),
            None => Markup::empty(),
        }
    }

    fn year(&self, entry: &Entry) -> Markup {
        self.field(entry, "year")
    }

    // -- per-entry-type templates ------------------------------------------

    fn format_entry(&self, entry: &Entry) -> Markup {
        // Dispatch on the lowercased source form so legacy BibTeX types and
        // their biblatex equivalents land on the same template.
        let kind = entry.entry_type.to_string().to_lowercase();
        match kind.as_str() {
            "article" | "periodical" => Markup::tagged("bib-article", self.article(entry)),
            "book" | "mvbook" | "collection" => Markup::tagged("bib-book", self.book(entry)),
            "booklet" => Markup::tagged("bib-booklet", self.booklet(entry)),
            "inbook" | "bookinbook" => Markup::tagged("bib-inbook", self.inbook(entry)),
            "incollection" => Markup::tagged("bib-incollection", self.incollection(entry)),
            "inproceedings" | "conference" => {
                Markup::tagged("bib-inproceedings", self.inproceedings(entry))
            }
            "manual" => Markup::tagged("bib-manual", self.manual(entry)),
            "mastersthesis" => {
                Markup::tagged("bib-mastersthesis", self.thesis(entry, "Master's thesis"))
            }
            "phdthesis" | "thesis" => {
                Markup::tagged("bib-phdthesis", self.thesis(entry, "PhD thesis"))
            }
            "proceedings" | "mvproceedings" => {
                Markup::tagged("bib-proceedings", self.proceedings(entry))
            }
            "techreport" | "report" => Markup::tagged("bib-techreport", self.techreport(entry)),
            "unpublished" => Markup::tagged("bib-unpublished", self.unpublished(entry)),
            _ => Markup::tagged("bib-misc", self.misc(entry)),
        }
    }

    fn article(&self, e: &Entry) -> Markup {
        let journal = field_text(e, "journal").or_else(|| field_text(e, "journaltitle"));
        let mut venue = Vec::new();
        if let Some(journal) = journal {
            venue.push(Markup::emph(Markup::text(journal)));
        }
        if let Some(vp) = volume_pages(e) {
            venue.push(Markup::text(vp));
        }
        venue.push(self.year(e));
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::join(venue, ", "),
            self.web_refs(e),
        ])
    }

    fn book(&self, e: &Entry) -> Markup {
        sentences(vec![
            self.author_or_editor(e),
            self.btitle(e, "title"),
            self.volume_and_series(e),
            Markup::join(
                vec![
                    self.field(e, "publisher"),
                    self.field(e, "address"),
                    self.edition(e),
                    self.year(e),
                ],
                ", ",
            ),
            self.web_refs(e),
        ])
    }

    fn booklet(&self, e: &Entry) -> Markup {
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::join(
                vec![
                    self.field(e, "howpublished"),
                    self.field(e, "address"),
                    self.year(e),
                ],
                ", ",
            ),
        ])
    }

    fn inbook(&self, e: &Entry) -> Markup {
        sentences(vec![
            self.author_or_editor(e),
            self.btitle(e, "title"),
            self.chapter_and_pages(e),
            self.volume_and_series(e),
            Markup::join(
                vec![
                    self.field(e, "publisher"),
                    self.field(e, "address"),
                    self.edition(e),
                    self.year(e),
                ],
                ", ",
            ),
        ])
    }

    fn incollection(&self, e: &Entry) -> Markup {
        let mut container = vec![Markup::text("In ")];
        let editor = self.editor(e);
        if !editor.is_empty() {
            container.push(editor);
            container.push(Markup::text(", "));
        }
        container.push(self.btitle(e, "booktitle"));
        let pages = self.chapter_and_pages(e);
        if !pages.is_empty() {
            container.push(Markup::text(", "));
            container.push(pages);
        }
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::Seq(container),
            Markup::join(
                vec![
                    self.field(e, "publisher"),
                    self.field(e, "address"),
                    self.year(e),
                ],
                ", ",
            ),
            self.web_refs(e),
        ])
    }

    fn inproceedings(&self, e: &Entry) -> Markup {
        let mut container = vec![Markup::text("In ")];
        container.push(self.btitle(e, "booktitle"));
        let pages = self.chapter_and_pages(e);
        if !pages.is_empty() {
            container.push(Markup::text(", "));
            container.push(pages);
        }
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::Seq(container),
            Markup::join(
                vec![
                    self.field(e, "organization"),
                    self.field(e, "publisher"),
                    self.field(e, "address"),
                    self.year(e),
                ],
                ", ",
            ),
            self.web_refs(e),
        ])
    }

    fn manual(&self, e: &Entry) -> Markup {
        sentences(vec![
            self.author_or_editor(e),
            self.btitle(e, "title"),
            Markup::join(
                vec![
                    self.field(e, "organization"),
                    self.field(e, "address"),
                    self.edition(e),
                    self.year(e),
                ],
                ", ",
            ),
        ])
    }

    fn thesis(&self, e: &Entry, kind: &str) -> Markup {
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::join(
                vec![
                    Markup::text(kind),
                    self.field(e, "school"),
                    self.field(e, "address"),
                    self.year(e),
                ],
                ", ",
            ),
            self.web_refs(e),
        ])
    }

    fn proceedings(&self, e: &Entry) -> Markup {
        sentences(vec![
            self.editor(e),
            self.btitle(e, "title"),
            self.volume_and_series(e),
            Markup::join(
                vec![
                    self.field(e, "organization"),
                    self.field(e, "publisher"),
                    self.field(e, "address"),
                    self.year(e),
                ],
                ", ",
            ),
        ])
    }

    fn techreport(&self, e: &Entry) -> Markup {
        let report = match field_text(e, "number") {
            Some(number) => Markup::text(format!("Technical Report {}", number)),
            None => Markup::text("Technical report"),
        };
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::join(
                vec![
                    report,
                    self.field(e, "institution"),
                    self.field(e, "address"),
                    self.year(e),
                ],
                ", ",
            ),
            self.web_refs(e),
        ])
    }

    fn unpublished(&self, e: &Entry) -> Markup {
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::join(vec![self.field(e, "note"), self.year(e)], ", "),
        ])
    }

    fn misc(&self, e: &Entry) -> Markup {
        sentences(vec![
            self.names(e, "author"),
            self.title(e),
            Markup::join(vec![self.field(e, "howpublished"), self.year(e)], ", "),
            self.web_refs(e),
        ])
    }
}

impl Style for PlainStyle {
    fn format_entries<'a>(&self, mut entries: Vec<&'a Entry>) -> Vec<(String, Markup)> {
        self.sort_entries(&mut entries);
        entries
            .into_iter()
            .map(|e| (e.key.clone(), self.format_entry(e)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn persons(entry: &Entry, field: &str) -> Vec<Person> {
    entry.get_as::<Vec<Person>>(field).unwrap_or_default()
}

/// Sort key for year-ordered output; entries without a numeric year sort last.
fn numeric_year(entry: &Entry) -> i64 {
    field_text(entry, "year")
        .and_then(|y| y.trim().parse().ok())
        .unwrap_or(i64::MAX)
}

fn abbreviate(given: &str) -> String {
    given
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .map(|c| format!("{}.", c))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_words(words: &[&str]) -> String {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// "12(3):45-67" from volume/number/pages, as far as they are present.
fn volume_pages(entry: &Entry) -> Option<String> {
    let volume = field_text(entry, "volume");
    let number = field_text(entry, "number");
    let pages = field_text(entry, "pages").map(|p| normalize_pages(&p));
    let mut out = String::new();
    if let Some(v) = volume {
        out.push_str(&v);
    }
    if let Some(n) = number {
        out.push_str(&format!("({})", n));
    }
    if let Some(p) = pages {
        if out.is_empty() {
            out.push_str(&format!("pages {}", p));
        } else {
            out.push_str(&format!(":{}", p));
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// BibTeX page ranges use `--`; collapse to a single dash for display.
fn normalize_pages(pages: &str) -> String {
    pages.replace("--", "-")
}

/// Joins the non-empty pieces with ". " and a trailing period.
fn sentences(pieces: Vec<Markup>) -> Markup {
    let pieces: Vec<Markup> = pieces.into_iter().filter(|p| !p.is_empty()).collect();
    if pieces.is_empty() {
        return Markup::empty();
    }
    let mut seq = Vec::with_capacity(pieces.len() * 2);
    for (i, piece) in pieces.into_iter().enumerate() {
        if i > 0 {
            seq.push(Markup::text(". "));
        }
        seq.push(piece);
    }
    seq.push(Markup::text("."));
    Markup::Seq(seq)
}
