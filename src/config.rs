//! Site settings.
//!
//! Settings mirror the host configuration surface: where the bibliography
//! lives, how entries are grouped, whether citations are decorated, and the
//! style configuration forwarded to the citation style. They can be loaded
//! from a TOML file or built in code; every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::style::StyleConfig;

/// Errors that can occur when loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Global settings for publication-list rendering.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Path to the bibliography file rendered on the publications page.
    pub source: Option<PathBuf>,
    /// Entry field used to split publications into groups.
    pub split_by: Option<String>,
    /// Group label for entries without a split-field value.
    pub untagged_title: Option<String>,
    /// Decorate structural citation pieces with `<span>` tags.
    pub decorate_html: bool,
    /// Template used when a directive does not name one.
    pub default_template: Option<String>,
    /// Citation style configuration.
    pub style: StyleConfig,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::SortOrder;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.split_by, None);
        assert_eq!(settings.untagged_title, None);
        assert!(!settings.decorate_html);
        assert_eq!(settings.style.sort, SortOrder::None);
    }

    #[test]
    fn test_from_toml_str() {
        // Given: a settings file using every section
        let content = r#"
source = "content/pubs.bib"
split-by = "tags"
untagged-title = "Other"
decorate-html = true
default-template = "bibliography_by_group"

[style]
name = "abbrv"
sort = "year-desc"
name-order = "family-given"
"#;

        // When: we parse it
        let settings = Settings::from_toml_str(content).unwrap();

        // Then: every key landed
        assert_eq!(settings.source.as_deref(), Some(Path::new("content/pubs.bib")));
        assert_eq!(settings.split_by.as_deref(), Some("tags"));
        assert_eq!(settings.untagged_title.as_deref(), Some("Other"));
        assert!(settings.decorate_html);
        assert_eq!(settings.default_template.as_deref(), Some("bibliography_by_group"));
        assert_eq!(settings.style.name.as_deref(), Some("abbrv"));
        assert_eq!(settings.style.sort, SortOrder::YearDesc);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = Settings::from_toml_str("not-a-setting = 1\n");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Settings::from_toml_file(Path::new("/nonexistent/publist.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }
}
