//! Shared fixtures and helpers for integration tests.

/// Builds a BibTeX bibliography from `(key, tags)` pairs.
///
/// Each entry gets an auto-generated author (`AuthorX` where X is the last
/// char of the key) and a title (`Title {key}`), all dated 2020. A `tags`
/// value of `None` omits the field entirely; `Some("")` writes it empty.
pub fn build_bib(entries: &[(&str, Option<&str>)]) -> String {
    entries
        .iter()
        .map(|(key, tags)| {
            let tags_field = match tags {
                Some(tags) => format!("    tags = {{{}}},\n", tags),
                None => String::new(),
            };
            format!(
                "@misc{{{key},\n    author = {{Author{initial}}},\n    title = {{Title {key}}},\n    year = {{2020}},\n{tags_field}}}\n",
                key = key,
                initial = key.chars().last().unwrap_or('X'),
                tags_field = tags_field,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keys of the records in a published JSON list.
pub fn record_keys(list: &serde_json::Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap().to_string())
        .collect()
}
