use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::scoring::is_unlikely_name;

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove non-content tags (scripts, styles, navigation, ...)
    pub remove_unwanted: bool,
    /// Whether to unwrap containers whose class/id marks them as boilerplate
    pub remove_unlikely: bool,
    /// Whether to remove elements hidden with inline styles or `hidden`
    pub remove_hidden: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_unwanted: true, remove_unlikely: true, remove_hidden: true }
    }
}

/// Tags dropped together with their content before scoring.
const UNWANTED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "canvas", "nav", "footer", "aside", "form", "button",
];

static COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static HIDDEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("valid regex"));
static CLASS_ATTR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+(class|style|id)=("[^"]*"|'[^']*')"#).expect("valid regex"));

/// Preprocess HTML by removing unwanted elements before scoring
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let processed = COMMENT_PATTERN.replace_all(html, "").into_owned();
    rewrite(&processed, |settings| {
        if config.remove_unwanted {
            for tag in UNWANTED_TAGS {
                settings.push(lol_html::element!(*tag, |el| {
                    el.remove();
                    Ok(())
                }));
            }
            settings.push(lol_html::element!(r#"[role="navigation"]"#, |el| {
                el.remove();
                Ok(())
            }));
        }
        if config.remove_hidden {
            settings.push(lol_html::element!("*", |el| {
                let hidden_style = el.get_attribute("style").is_some_and(|s| HIDDEN_PATTERN.is_match(&s));
                if hidden_style || el.has_attribute("hidden") || el.get_attribute("aria-hidden").as_deref() == Some("true")
                {
                    el.remove();
                }
                Ok(())
            }));
        }
        if config.remove_unlikely {
            settings.push(lol_html::element!("*", |el| {
                if matches!(el.tag_name().as_str(), "html" | "body" | "main" | "article") {
                    return Ok(());
                }
                let id = el.get_attribute("id").unwrap_or_default();
                let class = el.get_attribute("class").unwrap_or_default();
                if is_unlikely_name(&id) || class.split_whitespace().any(is_unlikely_name) {
                    el.remove_and_keep_content();
                }
                Ok(())
            }));
        }
    })
}

/// Rewrite relative `href`/`src` attributes to absolute URLs
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    rewrite(html, |settings| {
        settings.push(lol_html::element!("a[href]", |el| {
            if let Some(href) = el.get_attribute("href")
                && !href.starts_with('#')
                && let Ok(absolute) = base_url.join(&href)
            {
                el.set_attribute("href", absolute.as_str()).ok();
            }
            Ok(())
        }));
        settings.push(lol_html::element!("img[src]", |el| {
            if let Some(src) = el.get_attribute("src")
                && let Ok(absolute) = base_url.join(&src)
            {
                el.set_attribute("src", absolute.as_str()).ok();
            }
            Ok(())
        }));
    })
}

/// Strip presentational attributes (class, style, id) from HTML
pub fn strip_attributes(html: &str) -> String {
    CLASS_ATTR_PATTERN.replace_all(html, "").into_owned()
}

type Handlers<'h> = Vec<(
    std::borrow::Cow<'static, lol_html::Selector>,
    lol_html::ElementContentHandlers<'h>,
)>;

/// Runs a lol_html pass with the handlers registered by `register`.
///
/// Rewriter errors fall back to the input unchanged.
fn rewrite<'h>(html: &str, register: impl FnOnce(&mut Handlers<'h>)) -> String {
    let mut handlers: Handlers<'h> = Vec::new();
    register(&mut handlers);
    if handlers.is_empty() {
        return html.to_string();
    }

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    output
}
