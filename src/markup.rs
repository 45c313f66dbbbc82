//! Renderable citation markup.
//!
//! Styles build a small node tree instead of flat strings so that structural
//! pieces (names, title, venue) stay identifiable until render time. Tagged
//! nodes carry the sentinel class later rewritten into `<span>` tags by the
//! [`crate::rewrite`] module.

/// A renderable fragment of a formatted citation.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    /// Plain text, HTML-escaped at render time.
    Text(String),
    /// Emphasized text, rendered as `<em>` in both render modes.
    Emph(Box<Markup>),
    /// A hyperlink.
    Link { url: String, inner: Box<Markup> },
    /// A structural piece carrying a sentinel class like `bib-title`.
    ///
    /// Rendered transparently unless decoration is enabled, in which case the
    /// inner rendering is bracketed by `<:class>` / `</:class>` markers.
    Tagged(&'static str, Box<Markup>),
    /// Concatenation of fragments.
    Seq(Vec<Markup>),
}

impl Markup {
    /// A fragment that renders to nothing.
    pub fn empty() -> Markup {
        Markup::Seq(Vec::new())
    }

    pub fn text(s: impl Into<String>) -> Markup {
        Markup::Text(s.into())
    }

    pub fn emph(inner: Markup) -> Markup {
        Markup::Emph(Box::new(inner))
    }

    pub fn link(url: impl Into<String>, inner: Markup) -> Markup {
        Markup::Link {
            url: url.into(),
            inner: Box::new(inner),
        }
    }

    pub fn tagged(class: &'static str, inner: Markup) -> Markup {
        Markup::Tagged(class, Box::new(inner))
    }

    /// Joins the non-empty items with a separator.
    pub fn join(items: Vec<Markup>, separator: &str) -> Markup {
        let items: Vec<Markup> = items.into_iter().filter(|m| !m.is_empty()).collect();
        let mut seq = Vec::with_capacity(items.len() * 2);
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                seq.push(Markup::text(separator));
            }
            seq.push(item);
        }
        Markup::Seq(seq)
    }

    /// Whether rendering this fragment produces an empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Markup::Text(s) => s.is_empty(),
            Markup::Emph(inner) | Markup::Tagged(_, inner) => inner.is_empty(),
            Markup::Link { inner, .. } => inner.is_empty(),
            Markup::Seq(items) => items.iter().all(Markup::is_empty),
        }
    }

    /// Flattens the tree to a string.
    ///
    /// With `decorate` every tagged node is bracketed by its sentinel marker
    /// pair; without it tagged nodes render transparently, so the output is
    /// exactly the undecorated rendering. Empty fragments never emit markers.
    pub fn render(&self, decorate: bool) -> String {
        let mut out = String::new();
        self.render_into(&mut out, decorate);
        out
    }

    fn render_into(&self, out: &mut String, decorate: bool) {
        if self.is_empty() {
            return;
        }
        match self {
            Markup::Text(s) => out.push_str(&escape_html(s)),
            Markup::Emph(inner) => {
                out.push_str("<em>");
                inner.render_into(out, decorate);
                out.push_str("</em>");
            }
            Markup::Link { url, inner } => {
                out.push_str("<a href=\"");
                out.push_str(&escape_html(url));
                out.push_str("\">");
                inner.render_into(out, decorate);
                out.push_str("</a>");
            }
            Markup::Tagged(class, inner) => {
                if decorate {
                    out.push_str("<:");
                    out.push_str(class);
                    out.push('>');
                    inner.render_into(out, decorate);
                    out.push_str("</:");
                    out.push_str(class);
                    out.push('>');
                } else {
                    inner.render_into(out, decorate);
                }
            }
            Markup::Seq(items) => {
                for item in items {
                    item.render_into(out, decorate);
                }
            }
        }
    }
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_escaped() {
        // Given: text containing HTML-significant characters
        let markup = Markup::text("Foo & Bar <baz>");

        // When: we render it
        let result = markup.render(false);

        // Then: the characters are escaped
        assert_eq!(result, "Foo &amp; Bar &lt;baz&gt;");
    }

    #[test]
    fn test_tagged_renders_transparently_without_decoration() {
        let markup = Markup::tagged("bib-title", Markup::text("Foo"));
        assert_eq!(markup.render(false), "Foo");
    }

    #[test]
    fn test_tagged_emits_markers_with_decoration() {
        let markup = Markup::tagged("bib-title", Markup::text("Foo"));
        assert_eq!(markup.render(true), "<:bib-title>Foo</:bib-title>");
    }

    #[test]
    fn test_nested_tags_nest_markers() {
        // Given: a tagged node containing another tagged node
        let markup = Markup::tagged(
            "bib-article",
            Markup::Seq(vec![
                Markup::tagged("bib-names", Markup::text("Doe")),
                Markup::text(". "),
                Markup::tagged("bib-title", Markup::text("Title")),
            ]),
        );

        // When: we render with decoration
        let result = markup.render(true);

        // Then: markers nest following the tree structure
        assert_eq!(
            result,
            "<:bib-article><:bib-names>Doe</:bib-names>. <:bib-title>Title</:bib-title></:bib-article>"
        );
    }

    #[test]
    fn test_empty_tagged_node_emits_nothing() {
        // An empty sub-rendering must not leave marker litter behind
        let markup = Markup::tagged("bib-editor", Markup::empty());
        assert_eq!(markup.render(true), "");
        assert_eq!(markup.render(false), "");
    }

    #[test]
    fn test_decoration_is_additive() {
        // Given: a tree with tags
        let markup = Markup::Seq(vec![
            Markup::tagged("bib-names", Markup::text("Doe")),
            Markup::text(". 2021."),
        ]);

        // Then: the undecorated rendering equals the decorated rendering
        // with the markers removed
        let plain = markup.render(false);
        let decorated = markup.render(true);
        assert_eq!(plain, "Doe. 2021.");
        assert_eq!(decorated.replace("<:bib-names>", "").replace("</:bib-names>", ""), plain);
    }

    #[test]
    fn test_join_skips_empty_items() {
        let markup = Markup::join(
            vec![Markup::text("a"), Markup::empty(), Markup::text("b")],
            ", ",
        );
        assert_eq!(markup.render(false), "a, b");
    }

    #[test]
    fn test_link_renders_anchor() {
        let markup = Markup::link("https://doi.org/10.1/2", Markup::text("doi:10.1/2"));
        assert_eq!(
            markup.render(false),
            "<a href=\"https://doi.org/10.1/2\">doi:10.1/2</a>"
        );
    }

    #[test]
    fn test_emph_renders_in_both_modes() {
        let markup = Markup::emph(Markup::text("Journal"));
        assert_eq!(markup.render(false), "<em>Journal</em>");
        assert_eq!(markup.render(true), "<em>Journal</em>");
    }
}
