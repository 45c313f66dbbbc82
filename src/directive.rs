//! The `.. bibliography::` document directive.
//!
//! Documents can embed publication lists inline:
//!
//! ```text
//! .. bibliography:: pubs.bib
//!    :template: bibliography_by_group
//!    :split-by: tags
//!    :untagged: Other
//! ```
//!
//! The bibliography comes from the path argument or, alternatively, from
//! literal BibTeX block content after a blank line; exactly one of the two
//! must be present. Every invocation works on its own copy of the
//! surrounding template context, so one directive's grouping or filter never
//! leaks into another's.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::config::Settings;
use crate::context::{self, Context, ContextError};
use crate::markup::escape_html;
use crate::processor;
use crate::style::{NameOrder, SortOrder};
use crate::template::{TemplateError, TemplateRenderer, DEFAULT_TEMPLATE};

/// Errors raised by directive parsing or execution.
///
/// These are fatal to the directive instance that caused them, never to the
/// surrounding build.
#[derive(Error, Debug)]
pub enum DirectiveError {
    #[error("bibliography directive needs a file argument or literal content")]
    MissingSource,

    #[error("bibliography directive takes a file argument or literal content, not both")]
    ConflictingSource,

    #[error("unknown directive option ':{0}:'")]
    UnknownOption(String),

    #[error("invalid value for directive option ':{option}:': {message}")]
    InvalidOption { option: String, message: String },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Per-invocation options; set values override global settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveOptions {
    pub template: Option<String>,
    /// Extra template variables merged into the context after publishing.
    pub extra: Context,
    /// CSS classes for the wrapping element.
    pub classes: Option<Vec<String>>,
    /// Narrow the published flat list to one group.
    pub group: Option<String>,
    pub split_by: Option<String>,
    pub untagged: Option<String>,
    pub decorate: Option<bool>,
    pub style: Option<String>,
    pub sort: Option<SortOrder>,
    pub abbreviate_names: Option<bool>,
    pub name_order: Option<NameOrder>,
}

impl DirectiveOptions {
    /// Parses `:name: value` pairs into validated options.
    ///
    /// Unknown names and malformed values are directive errors; option
    /// values are never evaluated as code.
    pub fn parse(pairs: &[(String, String)]) -> Result<Self, DirectiveError> {
        let mut options = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "template" => options.template = Some(required(name, value)?),
                "extra" => options.extra = parse_extra(value)?,
                "class" => {
                    options.classes =
                        Some(value.split_whitespace().map(str::to_string).collect())
                }
                "group" => options.group = Some(required(name, value)?),
                "split-by" => options.split_by = Some(required(name, value)?),
                "untagged" => options.untagged = Some(required(name, value)?),
                "decorate" => options.decorate = Some(parse_flag(name, value)?),
                "style" => options.style = Some(required(name, value)?),
                "sort" => options.sort = Some(parse_keyword(name, value)?),
                "abbreviate-names" => {
                    options.abbreviate_names = Some(parse_flag(name, value)?)
                }
                "name-order" => options.name_order = Some(parse_keyword(name, value)?),
                other => return Err(DirectiveError::UnknownOption(other.to_string())),
            }
        }
        Ok(options)
    }

    /// Applies the per-invocation overrides on top of global settings.
    pub fn merged_settings(&self, settings: &Settings) -> Settings {
        let mut merged = settings.clone();
        if let Some(v) = &self.split_by {
            merged.split_by = Some(v.clone());
        }
        if let Some(v) = &self.untagged {
            merged.untagged_title = Some(v.clone());
        }
        if let Some(v) = self.decorate {
            merged.decorate_html = v;
        }
        if let Some(v) = &self.style {
            merged.style.name = Some(v.clone());
        }
        if let Some(v) = self.sort {
            merged.style.sort = v;
        }
        if let Some(v) = self.abbreviate_names {
            merged.style.abbreviate_names = v;
        }
        if let Some(v) = self.name_order {
            merged.style.name_order = v;
        }
        merged
    }
}

fn required(name: &str, value: &str) -> Result<String, DirectiveError> {
    if value.is_empty() {
        return Err(DirectiveError::InvalidOption {
            option: name.to_string(),
            message: "a value is required".to_string(),
        });
    }
    Ok(value.to_string())
}

/// Flag options accept an empty value (meaning true) or an explicit bool.
fn parse_flag(name: &str, value: &str) -> Result<bool, DirectiveError> {
    match value {
        "" | "true" => Ok(true),
        "false" => Ok(false),
        other => Err(DirectiveError::InvalidOption {
            option: name.to_string(),
            message: format!("expected 'true' or 'false', got '{}'", other),
        }),
    }
}

/// Keyword options reuse the serde names of the target enum.
fn parse_keyword<T: serde::de::DeserializeOwned>(
    name: &str,
    value: &str,
) -> Result<T, DirectiveError> {
    serde_json::from_value(Value::String(value.to_string())).map_err(|e| {
        DirectiveError::InvalidOption {
            option: name.to_string(),
            message: e.to_string(),
        }
    })
}

/// The `:extra:` value is a literal JSON object, parsed and validated rather
/// than evaluated.
fn parse_extra(value: &str) -> Result<Context, DirectiveError> {
    let parsed: Value =
        serde_json::from_str(value).map_err(|e| DirectiveError::InvalidOption {
            option: "extra".to_string(),
            message: e.to_string(),
        })?;
    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(DirectiveError::InvalidOption {
            option: "extra".to_string(),
            message: "expected a JSON object".to_string(),
        }),
    }
}

/// One parsed directive invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveArgs {
    /// Bibliography file path argument, if given.
    pub path: Option<String>,
    /// Literal BibTeX block content, if given.
    pub content: Option<String>,
    pub options: DirectiveOptions,
}

/// A directive occurrence found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBlock {
    pub args: DirectiveArgs,
    /// Byte span of the whole block in the source text.
    pub span: (usize, usize),
}

/// Finds every `.. bibliography::` block in a document.
///
/// A block is the marker line plus the following indented lines: first the
/// `:name: value` options, then, after a blank line, optional literal block
/// content. Trailing blank lines are not part of the block.
pub fn extract_directives(document: &str) -> Result<Vec<DirectiveBlock>, DirectiveError> {
    let marker = Regex::new(r"^\.\.[ \t]+bibliography::[ \t]*(.*)$").unwrap();
    let option_line = Regex::new(r"^[ \t]+:([A-Za-z-]+):[ \t]*(.*)$").unwrap();

    let lines = line_spans(document);
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let (block_start, mut block_end, text) = lines[i];
        let Some(caps) = marker.captures(text) else {
            i += 1;
            continue;
        };
        let arg = caps.get(1).map_or("", |m| m.as_str()).trim();
        let path = if arg.is_empty() {
            None
        } else {
            Some(arg.to_string())
        };

        let mut option_pairs: Vec<(String, String)> = Vec::new();
        let mut content_lines: Vec<String> = Vec::new();
        let mut in_content = false;
        let mut pending_blanks = 0usize;
        let mut j = i + 1;
        while j < lines.len() {
            let (_, line_end, line) = lines[j];
            if line.trim().is_empty() {
                pending_blanks += 1;
                j += 1;
                continue;
            }
            if !line.starts_with(' ') && !line.starts_with('\t') {
                break;
            }
            if !in_content {
                if pending_blanks > 0 {
                    // a blank line ends the option field list
                    in_content = true;
                } else if let Some(caps) = option_line.captures(line) {
                    option_pairs.push((caps[1].to_string(), caps[2].trim().to_string()));
                } else {
                    in_content = true;
                }
            }
            if in_content {
                if !content_lines.is_empty() {
                    // interior blank lines are part of the content
                    for _ in 0..pending_blanks {
                        content_lines.push(String::new());
                    }
                }
                content_lines.push(line.to_string());
            }
            pending_blanks = 0;
            block_end = line_end;
            j += 1;
        }

        let content = dedent(&content_lines);
        blocks.push(DirectiveBlock {
            args: DirectiveArgs {
                path,
                content,
                options: DirectiveOptions::parse(&option_pairs)?,
            },
            span: (block_start, block_end),
        });
        i = j;
    }
    Ok(blocks)
}

/// Byte spans of each line, with the line text stripped of its terminator.
fn line_spans(document: &str) -> Vec<(usize, usize, &str)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for line in document.split_inclusive('\n') {
        let end = start + line.len();
        spans.push((start, end, line.trim_end_matches(['\n', '\r'])));
        start = end;
    }
    spans
}

/// Strips the common leading whitespace from block content.
fn dedent(lines: &[String]) -> Option<String> {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()?;
    let content = lines
        .iter()
        .map(|l| if l.len() >= indent { &l[indent..] } else { "" })
        .collect::<Vec<_>>()
        .join("\n");
    let content = content.trim_end().to_string();
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

/// Resolves a directive path argument.
///
/// A leading `/` means "relative to the content root"; anything else is
/// relative to the directory of the document using the directive.
fn resolve_path(arg: &str, base_dir: &Path, content_root: &Path) -> PathBuf {
    match arg.strip_prefix('/') {
        Some(rest) => content_root.join(rest),
        None => base_dir.join(arg),
    }
}

/// Runs one directive invocation and returns the wrapped HTML block.
pub fn run(
    args: &DirectiveArgs,
    base_dir: &Path,
    content_root: &Path,
    settings: &Settings,
    base_context: &Context,
    renderer: &dyn TemplateRenderer,
) -> Result<String, DirectiveError> {
    let merged = args.options.merged_settings(settings);

    // own copy: side effects must not leak back into the page context
    let mut context = base_context.clone();

    let set = match (&args.path, &args.content) {
        (Some(_), Some(_)) => return Err(DirectiveError::ConflictingSource),
        (None, None) => return Err(DirectiveError::MissingSource),
        (Some(path), None) => {
            let resolved = resolve_path(path, base_dir, content_root);
            processor::publications_from_file(&resolved, &merged)
        }
        (None, Some(content)) => processor::publications_from_str(content, &merged),
    };

    if let Some(set) = &set {
        context::publish(&mut context, set, args.options.group.as_deref())?;
    }
    for (name, value) in &args.options.extra {
        context.insert(name.clone(), value.clone());
    }

    let template = args
        .options
        .template
        .as_deref()
        .or(merged.default_template.as_deref())
        .unwrap_or(DEFAULT_TEMPLATE);
    let html = renderer.render(template, &context)?;

    Ok(wrap_html(&html, args.options.classes.as_deref()))
}

/// Expands every directive block in a document.
///
/// Blocks are replaced from the end of the text towards the beginning so
/// earlier spans stay valid while later ones are rewritten.
pub fn expand_directives(
    document: &str,
    base_dir: &Path,
    content_root: &Path,
    settings: &Settings,
    base_context: &Context,
    renderer: &dyn TemplateRenderer,
) -> Result<String, DirectiveError> {
    let blocks = extract_directives(document)?;
    if blocks.is_empty() {
        return Ok(document.to_string());
    }

    let mut result = document.to_string();
    for block in blocks.iter().rev() {
        let html = run(
            &block.args,
            base_dir,
            content_root,
            settings,
            base_context,
            renderer,
        )?;
        result.replace_range(block.span.0..block.span.1, &html);
    }
    Ok(result)
}

fn wrap_html(html: &str, classes: Option<&[String]>) -> String {
    let class_attr = match classes {
        Some(classes) if !classes.is_empty() => classes.join(" "),
        _ => "bibliography".to_string(),
    };
    let mut out = format!("<div class=\"{}\">\n", escape_html(&class_attr));
    out.push_str(html);
    if !html.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</div>\n");
    out
}
