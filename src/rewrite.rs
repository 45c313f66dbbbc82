//! Sentinel-marker rewriting.
//!
//! Formatted citations may carry markers like `<:bib-title>Foo</:bib-title>`
//! around their structural pieces. After the markup has been flattened to
//! text, these markers are rewritten into `<span>` tags:
//!
//! ```text
//! <:bib-xyz>abc</:bib-xyz>  =>  <span class="bib-xyz">abc</span>
//! ```

use regex::Regex;

/// Rewrites sentinel markers into `<span>` tags.
///
/// Every opening marker `<:IDENT>` becomes `<span class="IDENT">` and every
/// closing marker `</:IDENT>` becomes `</span>`. Closing markers are not
/// matched against opening ones, so unbalanced input produces unbalanced
/// (but well-defined) output. Text outside marker boundaries is untouched,
/// and running the rewrite on already-converted text is a no-op.
pub fn rewrite_markers(text: &str) -> String {
    let open = Regex::new(r"<:([^>]*)>").unwrap();
    let close = Regex::new(r"</:([^>]*)>").unwrap();

    let text = open.replace_all(text, r#"<span class="$1">"#);
    close.replace_all(&text, "</span>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_single_marker_pair() {
        // Given: text with one marker pair
        let text = "<:bib-title>Foo</:bib-title>";

        // When: we rewrite the markers
        let result = rewrite_markers(text);

        // Then: the pair becomes a span
        assert_eq!(result, r#"<span class="bib-title">Foo</span>"#);
    }

    #[test]
    fn test_rewrite_nested_markers() {
        let text = "<:bib-article><:bib-names>Doe</:bib-names>. Title</:bib-article>";
        let result = rewrite_markers(text);
        assert_eq!(
            result,
            r#"<span class="bib-article"><span class="bib-names">Doe</span>. Title</span>"#
        );
    }

    #[test]
    fn test_rewrite_leaves_plain_text_untouched() {
        let text = "Doe. A title. 2021.";
        assert_eq!(rewrite_markers(text), text);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        // Given: text that has already been rewritten
        let once = rewrite_markers("<:bib-doi>doi:10.1/2</:bib-doi> and <em>more</em>");

        // When: we rewrite it again
        let twice = rewrite_markers(&once);

        // Then: nothing changes
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rewrite_unbalanced_markers_do_not_panic() {
        // Closing markers are rewritten without identifier matching
        assert_eq!(rewrite_markers("</:bib-title>"), "</span>");
        assert_eq!(
            rewrite_markers("<:bib-a>unclosed"),
            r#"<span class="bib-a">unclosed"#
        );
        assert_eq!(
            rewrite_markers("<:a>x</:b>"),
            r#"<span class="a">x</span>"#
        );
    }

    #[test]
    fn test_rewrite_empty_identifier() {
        assert_eq!(rewrite_markers("<:>x</:>"), r#"<span class="">x</span>"#);
    }

    #[test]
    fn test_rewrite_arbitrary_angle_brackets_untouched() {
        // Ordinary tags and comparisons are not markers
        let text = "a < b, <em>c</em>, x > y";
        assert_eq!(rewrite_markers(text), text);
    }
}
