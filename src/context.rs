//! Template context publishing.
//!
//! The final step of a pass: expose the flat publication list and the bucket
//! mapping to the template boundary by mutating the caller-provided context
//! in place.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::Settings;
use crate::processor::{self, PublicationRecord, PublicationSet};

/// Context key holding the flat ordered list of publication records.
pub const PUBLICATIONS_KEY: &str = "publications";

/// Context key holding the bucket-label-to-records mapping.
pub const PUBLICATIONS_LISTS_KEY: &str = "publications_lists";

/// A template context.
pub type Context = Map<String, Value>;

/// Errors that can occur when publishing.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("no publication group named '{0}'")]
    GroupNotFound(String),
}

/// Publishes a pass result into the context.
///
/// Sets [`PUBLICATIONS_KEY`] to the flat list and [`PUBLICATIONS_LISTS_KEY`]
/// to the bucket mapping. With a `group` filter the flat-list key instead
/// holds that one bucket's ordered contents; the mapping key is unaffected.
/// Filtering by an unknown group is a lookup error and leaves the context
/// untouched.
pub fn publish(
    context: &mut Context,
    set: &PublicationSet,
    group: Option<&str>,
) -> Result<(), ContextError> {
    let publications: Vec<Value> = match group {
        None => records_to_values(&set.publications),
        Some(tag) => {
            let bucket = set
                .lists
                .get(tag)
                .ok_or_else(|| ContextError::GroupNotFound(tag.to_string()))?;
            records_to_values(bucket)
        }
    };

    let lists: Map<String, Value> = set
        .lists
        .iter()
        .map(|(label, records)| (label.clone(), Value::Array(records_to_values(records))))
        .collect();

    context.insert(PUBLICATIONS_KEY.to_string(), Value::Array(publications));
    context.insert(PUBLICATIONS_LISTS_KEY.to_string(), Value::Object(lists));
    Ok(())
}

fn records_to_values(records: &[PublicationRecord]) -> Vec<Value> {
    records.iter().map(PublicationRecord::to_value).collect()
}

/// Page-level entry point: populates the context from the configured
/// bibliography source.
///
/// Does nothing when no source is configured; a file that cannot be
/// processed is logged by the processor and leaves the context unpopulated.
pub fn populate(context: &mut Context, settings: &Settings) {
    let Some(source) = settings.source.as_deref() else {
        return;
    };
    if let Some(set) = processor::publications_from_file(source, settings) {
        // an unfiltered publish cannot fail
        publish(context, &set, None).ok();
    }
}
