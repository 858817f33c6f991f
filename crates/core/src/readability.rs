//! Main content extraction.
//!
//! [`Readability`] reduces a full documentation page to its main readable
//! content: boilerplate is stripped, text blocks are scored, and the best
//! scoring container plus its related siblings become the extracted
//! fragment.
//!
//! # Example
//!
//! ```rust
//! use sitemd_core::readability::extract;
//! use url::Url;
//!
//! let html = r#"<html><head><title>Install</title></head><body>
//!     <nav><a href="/">Home</a></nav>
//!     <article><p>Download the installer, run it, and follow the prompts to finish the setup.</p></article>
//! </body></html>"#;
//! let url = Url::parse("https://docs.example.test/install").unwrap();
//! let page = extract(html, Some("text/html; charset=utf-8"), &url).unwrap();
//! assert_eq!(page.title, "Install");
//! assert!(page.content.contains("Download the installer"));
//! assert!(!page.content.contains("Home"));
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::parse::{Document, element_text};
use crate::preprocess::{PreprocessConfig, convert_relative_urls, preprocess_html, strip_attributes};
use crate::scoring::{ScoreConfig, base_tag_score, class_id_weight, link_density, paragraph_score};
use crate::{Result, SitemdError};

static PARAGRAPH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, pre, td, li, dd, blockquote").expect("valid selector"));

/// Content types accepted by the extractor.
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Whether a `Content-Type` header value names an HTML document.
///
/// Parameters such as `charset` are ignored and a missing header is not HTML.
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
        .is_some_and(|mime| HTML_CONTENT_TYPES.contains(&mime.as_str()))
}

/// Configuration for content extraction.
///
/// ```rust
/// use sitemd_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(30.0)
///     .keep_classes(true)
///     .build();
/// assert!(config.keep_classes);
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score the top candidate needs; below it the whole body is used (default: 20.0).
    pub min_score: f64,

    /// Text blocks shorter than this many characters are not scored (default: 25).
    pub min_paragraph_len: usize,

    /// Fraction of the top score a sibling needs to be kept alongside it (default: 0.2).
    pub sibling_threshold: f64,

    /// Whether to preserve class/id/style attributes in the fragment (default: false).
    pub keep_classes: bool,

    pub preprocess: PreprocessConfig,
    pub score: ScoreConfig,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 20.0,
            min_paragraph_len: 25,
            sibling_threshold: 0.2,
            keep_classes: false,
            preprocess: PreprocessConfig::default(),
            score: ScoreConfig::default(),
        }
    }
}

impl ReadabilityConfig {
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for [`ReadabilityConfig`].
#[derive(Debug, Default)]
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the minimum scored paragraph length.
    pub fn min_paragraph_len(mut self, value: usize) -> Self {
        self.config.min_paragraph_len = value;
        self
    }

    /// Sets the sibling inclusion threshold.
    pub fn sibling_threshold(mut self, value: f64) -> Self {
        self.config.sibling_threshold = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    /// Sets the preprocessing options.
    pub fn preprocess(mut self, value: PreprocessConfig) -> Self {
        self.config.preprocess = value;
        self
    }

    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

/// The readable part of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// Reduced HTML fragment wrapped in a single `<div>`
    pub content: String,
    /// Best-guess page title, never empty
    pub title: String,
    /// Score of the chosen candidate, `None` when the body fallback was used
    pub top_score: Option<f64>,
}

/// Content extractor.
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Extracts the main content and title of a page.
    ///
    /// # Errors
    ///
    /// - [`SitemdError::UnsupportedContentType`] when `content_type` is not
    ///   HTML. Nothing is parsed in that case.
    /// - [`SitemdError::ExtractionParse`] when the document has no visible
    ///   text to extract.
    pub fn extract(&self, raw_html: &str, content_type: Option<&str>, url: &Url) -> Result<Extracted> {
        if !is_html_content_type(content_type) {
            return Err(SitemdError::UnsupportedContentType {
                url: url.to_string(),
                content_type: content_type.map(str::to_string),
            });
        }
        if raw_html.trim().is_empty() {
            return Err(parse_error(url, "empty document"));
        }

        let title = Document::parse(raw_html).best_title().unwrap_or_else(|| title_from_url(url));

        let cleaned = preprocess_html(raw_html, &self.config.preprocess);
        let document = Document::parse(&cleaned);
        let (fragment, top_score) = match self.select_content(&document) {
            Some((html, score)) => (html, Some(score)),
            None => match document.body() {
                Some(body) => (body.inner_html(), None),
                None => return Err(parse_error(url, "document has no body")),
            },
        };

        if Document::parse_fragment(&fragment).visible_text().is_empty() {
            return Err(parse_error(url, "no readable text found"));
        }

        let fragment = if self.config.keep_classes { fragment } else { strip_attributes(&fragment) };
        let content = format!("<div>{}</div>", convert_relative_urls(&fragment, url));

        Ok(Extracted { content, title, top_score })
    }

    /// Picks the best scoring container and gathers its related siblings.
    ///
    /// Returns `None` when no candidate reaches `min_score`.
    fn select_content(&self, document: &Document) -> Option<(String, f64)> {
        let config = &self.config;
        let mut candidates = HashMap::new();

        for block in document.html().select(&PARAGRAPH_SELECTOR) {
            let text = element_text(block);
            if text.chars().count() < config.min_paragraph_len {
                continue;
            }
            let points = paragraph_score(&text, &config.score);

            let Some(parent) = block.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            candidates.entry(parent.id()).or_insert_with(|| (parent, self.initial_score(parent))).1 += points;

            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                candidates
                    .entry(grandparent.id())
                    .or_insert_with(|| (grandparent, self.initial_score(grandparent)))
                    .1 += points / 2.0;
            }
        }

        for (element, score) in candidates.values_mut() {
            *score *= 1.0 - link_density(*element);
        }

        let (top, top_score) = candidates
            .values()
            .copied()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .filter(|(_, score)| *score >= config.min_score)?;

        let Some(parent) = top.parent().and_then(ElementRef::wrap) else {
            return Some((top.html(), top_score));
        };

        let threshold = (top_score * config.sibling_threshold).max(10.0);
        let mut html = String::new();
        for sibling in parent.children().filter_map(ElementRef::wrap) {
            let keep = sibling.id() == top.id()
                || candidates.get(&sibling.id()).is_some_and(|(_, score)| *score >= threshold)
                || is_standalone_paragraph(sibling);
            if keep {
                html.push_str(&sibling.html());
            }
        }

        Some((html, top_score))
    }

    fn initial_score(&self, element: ElementRef<'_>) -> f64 {
        base_tag_score(element) + class_id_weight(element, &self.config.score)
    }
}

/// A paragraph next to the main content that reads like prose.
fn is_standalone_paragraph(element: ElementRef<'_>) -> bool {
    if element.value().name() != "p" {
        return false;
    }
    let length = element_text(element).chars().count();
    let density = link_density(element);
    (length > 80 && density < 0.25) || (length > 0 && density == 0.0 && element_text(element).contains(". "))
}

/// Last non-empty path segment without its extension, or `"Untitled"`.
fn title_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|segment| segment.rsplit_once('.').map_or(segment, |(stem, _)| stem))
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.replace(['-', '_'], " "))
        .unwrap_or_else(|| "Untitled".to_string())
}

fn parse_error(url: &Url, reason: &str) -> SitemdError {
    SitemdError::ExtractionParse { url: url.to_string(), reason: reason.to_string() }
}

/// Extracts with the default configuration.
///
/// # Errors
///
/// See [`Readability::extract`].
pub fn extract(raw_html: &str, content_type: Option<&str>, url: &Url) -> Result<Extracted> {
    Readability::new().extract(raw_html, content_type, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn url() -> Url {
        Url::parse("https://docs.example.test/guide/getting-started.html").unwrap()
    }

    const DOC_PAGE: &str = r#"<!DOCTYPE html>
        <html><head><title>Getting Started | Docs</title></head>
        <body>
          <header class="masthead"><a href="/">Docs home</a></header>
          <div class="sidebar"><ul><li><a href="/a">Section A</a></li><li><a href="/b">Section B</a></li></ul></div>
          <div class="document">
            <h1>Getting Started</h1>
            <p>This guide walks you through installing the toolkit, creating a project, and running it locally.</p>
            <p>First, download the installer for your platform, run it, and confirm the version printed at the end.</p>
            <p>Next, create a project directory, add a configuration file, and <a href="reference/config.html">read the reference</a>.</p>
          </div>
          <footer>Copyright 2024</footer>
        </body></html>"#;

    #[rstest]
    #[case(Some("text/html"), true)]
    #[case(Some("text/html; charset=utf-8"), true)]
    #[case(Some("TEXT/HTML"), true)]
    #[case(Some("application/xhtml+xml"), true)]
    #[case(Some("text/plain"), false)]
    #[case(Some("application/json"), false)]
    #[case(Some(""), false)]
    #[case(None, false)]
    fn test_is_html_content_type(#[case] content_type: Option<&str>, #[case] expected: bool) {
        assert_eq!(is_html_content_type(content_type), expected);
    }

    #[test]
    fn test_extracts_main_content() {
        let page = extract(DOC_PAGE, Some("text/html"), &url()).unwrap();
        assert_eq!(page.title, "Getting Started | Docs");
        assert!(page.content.starts_with("<div>"));
        assert!(page.content.contains("download the installer"));
        assert!(page.content.contains("Getting Started"));
        assert!(!page.content.contains("Section A"));
        assert!(!page.content.contains("Copyright"));
        assert!(!page.content.contains("Docs home"));
        assert!(page.top_score.is_some());
    }

    #[test]
    fn test_rewrites_relative_links_and_strips_classes() {
        let page = extract(DOC_PAGE, Some("text/html"), &url()).unwrap();
        assert!(page.content.contains(r#"href="https://docs.example.test/guide/reference/config.html""#));
        assert!(!page.content.contains("class="));
    }

    #[test]
    fn test_keep_classes() {
        let reader = Readability::with_config(ReadabilityConfig::builder().keep_classes(true).build());
        let html = r#"<html><body><div class="content"><p class="lead">A paragraph long enough to count, with commas, and more text.</p></div></body></html>"#;
        let page = reader.extract(html, Some("text/html"), &url()).unwrap();
        assert!(page.content.contains(r#"class="lead""#));
    }

    #[test]
    fn test_rejects_non_html_before_parsing() {
        let err = extract("<html><body><p>Text</p></body></html>", Some("text/plain"), &url()).unwrap_err();
        assert!(matches!(err, SitemdError::UnsupportedContentType { content_type: Some(ref ct), .. } if ct == "text/plain"));

        let err = extract("<p>x</p>", None, &url()).unwrap_err();
        assert!(matches!(err, SitemdError::UnsupportedContentType { content_type: None, .. }));
    }

    #[test]
    fn test_short_page_falls_back_to_body() {
        let page = extract("<html><body><p>Just a line.</p></body></html>", Some("text/html"), &url()).unwrap();
        assert!(page.content.contains("Just a line."));
        assert!(page.top_score.is_none());
    }

    #[rstest]
    #[case("")]
    #[case("   \n ")]
    #[case("<html><head><title>T</title></head><body><script>var x = 1;</script></body></html>")]
    #[case("<html><body><nav><a href='/'>Only navigation</a></nav></body></html>")]
    fn test_empty_documents_fail(#[case] html: &str) {
        let err = extract(html, Some("text/html"), &url()).unwrap_err();
        assert!(matches!(err, SitemdError::ExtractionParse { .. }));
        assert!(err.to_string().contains("getting-started.html"));
    }

    #[test]
    fn test_malformed_markup_is_recovered() {
        let html = "<html><body><div><p>Unclosed paragraph with enough words to be kept, surely.<div><p>Another one";
        let page = extract(html, Some("text/html"), &url()).unwrap();
        assert!(page.content.contains("Unclosed paragraph"));
    }

    #[rstest]
    #[case("<html><head><meta property='og:title' content='OG'><title>T</title></head><body><h1>H</h1><p>Body text.</p></body></html>", "OG")]
    #[case("<html><head><title>T</title></head><body><h1>H</h1><p>Body text.</p></body></html>", "T")]
    #[case("<html><body><h1>Heading</h1><p>Body text.</p></body></html>", "Heading")]
    #[case("<html><body><p>Body text.</p></body></html>", "getting started")]
    fn test_title_fallback_chain(#[case] html: &str, #[case] expected: &str) {
        let page = extract(html, Some("text/html"), &url()).unwrap();
        assert_eq!(page.title, expected);
    }

    #[test]
    fn test_title_untitled() {
        let root = Url::parse("https://docs.example.test/").unwrap();
        let page = extract("<html><body><p>Body text.</p></body></html>", Some("text/html"), &root).unwrap();
        assert_eq!(page.title, "Untitled");
    }

    #[test]
    fn test_keeps_inline_text_with_boilerplate_classes() {
        let html = r#"<html><head><title>Plugins</title></head><body>
            <article>
              <h1>Plugins</h1>
              <p>To enable the plugin select <span class="menuselection">Tools ‣ Plugins ‣ Enable</span> from the main window, then restart the editor.</p>
              <pre><code><span class="token comment"># install the dependencies first</span>
pip install toolkit</code></pre>
              <p>Plugins are loaded in alphabetical order, and each one can declare the settings it needs.</p>
            </article>
          </body></html>"#;
        let page = extract(html, Some("text/html"), &url()).unwrap();
        let markdown = crate::markdown::to_markdown(&page.content);
        assert!(markdown.contains("select Tools ‣ Plugins ‣ Enable from the main window"));
        assert!(markdown.contains("# install the dependencies first"));
        assert!(markdown.contains("pip install toolkit"));
    }

    #[test]
    fn test_deterministic() {
        let a = extract(DOC_PAGE, Some("text/html"), &url()).unwrap();
        let b = extract(DOC_PAGE, Some("text/html"), &url()).unwrap();
        assert_eq!(a, b);
    }
}
