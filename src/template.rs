//! Template rendering boundary.
//!
//! Page templates belong to the host site generator; this module only
//! defines the seam and ships two builtin templates so the CLI and the
//! directive work out of the box.

use serde_json::Value;
use thiserror::Error;

use crate::context::{Context, PUBLICATIONS_KEY, PUBLICATIONS_LISTS_KEY};
use crate::markup::escape_html;

/// Name of the template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "bibliography";

/// Errors that can occur when rendering a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unknown template '{0}'")]
    Unknown(String),
}

/// Renders a named template against a context.
pub trait TemplateRenderer {
    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError>;
}

/// Returns the list of builtin template names.
pub fn builtin_template_names() -> Vec<&'static str> {
    vec!["bibliography", "bibliography_by_group"]
}

/// The builtin templates: a flat list and a per-group listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateRenderer for BuiltinTemplates {
    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        match name {
            "bibliography" => Ok(render_flat(context)),
            "bibliography_by_group" => Ok(render_grouped(context)),
            other => Err(TemplateError::Unknown(other.to_string())),
        }
    }
}

fn render_flat(context: &Context) -> String {
    let mut out = String::new();
    if let Some(heading) = context.get("heading").and_then(Value::as_str) {
        out.push_str(&format!("<h2>{}</h2>\n", escape_html(heading)));
    }
    render_list(&mut out, context.get(PUBLICATIONS_KEY));
    out
}

fn render_grouped(context: &Context) -> String {
    let mut out = String::new();
    let Some(lists) = context.get(PUBLICATIONS_LISTS_KEY).and_then(Value::as_object) else {
        return out;
    };
    for (label, records) in lists {
        out.push_str(&format!("<h2>{}</h2>\n", escape_html(label)));
        render_list(&mut out, Some(records));
    }
    out
}

fn render_list(out: &mut String, records: Option<&Value>) {
    out.push_str("<ul class=\"publications\">\n");
    if let Some(records) = records.and_then(Value::as_array) {
        for record in records {
            render_item(out, record);
        }
    }
    out.push_str("</ul>\n");
}

fn render_item(out: &mut String, record: &Value) {
    let key = record.get("key").and_then(Value::as_str).unwrap_or("");
    // `text` is rendered citation HTML, inserted as-is
    let text = record.get("text").and_then(Value::as_str).unwrap_or("");
    out.push_str(&format!("  <li id=\"{}\">{}", escape_html(key), text));
    for (field, label) in [("pdf", "pdf"), ("slides", "slides"), ("poster", "poster")] {
        if let Some(url) = record.get(field).and_then(Value::as_str) {
            out.push_str(&format!(
                " <a href=\"{}\">[{}]</a>",
                escape_html(url),
                label
            ));
        }
    }
    out.push_str("</li>\n");
}
