//! publist: render BibTeX publication lists into HTML.
//!
//! This library provides functionality to:
//! - Load and parse BibTeX bibliographies (via biblatex)
//! - Format entries with a pluggable citation style, optionally decorating
//!   structural pieces with `<span>` tags
//! - Group publications into named buckets by a configurable field
//! - Publish the results to a template context and expand inline
//!   `.. bibliography::` directives in documents

pub mod bib;
pub mod config;
pub mod context;
pub mod directive;
pub mod group;
pub mod markup;
pub mod processor;
pub mod rewrite;
pub mod style;
pub mod template;

pub use bib::{load_bibliography, parse_bibliography};
pub use config::Settings;
pub use context::{populate, publish, Context, PUBLICATIONS_KEY, PUBLICATIONS_LISTS_KEY};
pub use directive::{expand_directives, extract_directives, DirectiveArgs, DirectiveOptions};
pub use group::{group_records, parse_tags, GroupingIndex};
pub use processor::{
    build_publications, publications_from_file, publications_from_str, PublicationRecord,
    PublicationSet,
};
pub use rewrite::rewrite_markers;
pub use style::{builtin_style_names, resolve_style, Formatter, Style, StyleConfig};
pub use template::{builtin_template_names, BuiltinTemplates, TemplateRenderer, DEFAULT_TEMPLATE};
