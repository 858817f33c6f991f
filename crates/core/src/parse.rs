//! HTML parsing helpers.
//!
//! [`Document`] wraps a `scraper::Html` tree and exposes the few queries the
//! crawler needs: the title, the visible text, and the ordered list of
//! anchor `href` values.
//!
//! # Example
//!
//! ```rust
//! use sitemd_core::parse::Document;
//!
//! let html = r#"<html><head><title>Guide</title></head>
//!     <body><a href="/a">A</a><a href="b.html">B</a></body></html>"#;
//! let doc = Document::parse(html);
//! assert_eq!(doc.title(), Some("Guide".to_string()));
//! assert_eq!(doc.links(), vec!["/a", "b.html"]);
//! ```

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static OG_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"], meta[name="og:title"]"#).expect("valid selector")
});
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Elements whose text is never shown to a reader.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document. html5ever recovers from any markup, so
    /// this never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parses an HTML fragment such as extracted content.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html) }
    }

    /// Gets the underlying `scraper::Html` tree.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Gets the `<body>` element, if the document has one.
    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.html.select(&BODY_SELECTOR).next()
    }

    /// Gets the content of the `<title>` element, whitespace-collapsed.
    pub fn title(&self) -> Option<String> {
        self.html
            .select(&TITLE_SELECTOR)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    }

    /// Best-guess page title: Open Graph title, then `<title>`, then the
    /// first `<h1>`.
    pub fn best_title(&self) -> Option<String> {
        let og = self
            .html
            .select(&OG_TITLE_SELECTOR)
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|t| !t.is_empty());
        if og.is_some() {
            return og;
        }

        self.title().or_else(|| {
            self.html
                .select(&H1_SELECTOR)
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .find(|t| !t.is_empty())
        })
    }

    /// Gets every anchor `href` value in document order.
    pub fn links(&self) -> Vec<String> {
        self.html
            .select(&ANCHOR_SELECTOR)
            .filter_map(|el| el.value().attr("href"))
            .map(str::to_string)
            .collect()
    }

    /// Gets the text a reader would see, with whitespace collapsed.
    ///
    /// Script, style and other non-rendered subtrees are skipped so that
    /// markup never leaks into language detection.
    pub fn visible_text(&self) -> String {
        let mut text = String::new();
        collect_visible_text(self.html.root_element(), &mut text);
        collapse_whitespace(&text)
    }
}

/// Appends the visible text under `element` to `out`, separating block-level
/// runs with spaces.
pub fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if INVISIBLE_TAGS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.push(' ');
                    collect_visible_text(child_el, out);
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Visible text of one element, whitespace-collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_visible_text(element, &mut text);
    collapse_whitespace(&text)
}

/// Collapses runs of whitespace to single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
