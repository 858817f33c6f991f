use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use crate::parse::element_text;

/// Configuration for content scoring
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum points awarded for paragraph length
    pub max_length_points: f64,
    /// Characters per length point
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self { positive_weight: 25.0, negative_weight: -25.0, max_length_points: 3.0, chars_per_point: 100 }
    }
}

/// Positive patterns that suggest an element contains main content
static POSITIVE_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|main|page|post|text|blog|story|document|documentwrapper|rst-content|markdown)")
        .expect("valid regex")
});

/// Negative patterns that suggest an element does NOT contain main content
static NEGATIVE_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|toc|navbar|masthead)")
        .expect("valid regex")
});

/// Base score for a container based on its tag name
///
/// - ARTICLE, MAIN: +10
/// - SECTION: +8
/// - DIV: +5
/// - TD, BLOCKQUOTE, PRE: +3
/// - FORM, lists: -3
/// - headings, TH, HEADER, FOOTER, NAV, ASIDE: -5
pub fn base_tag_score(element: ElementRef<'_>) -> f64 {
    match element.value().name() {
        "article" | "main" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" | "pre" => 3.0,
        "form" | "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" | "aside" => -5.0,
        _ => 0.0,
    }
}

/// Class/ID weight adjustment for an element
///
/// The id is checked before the class list; the first matching pattern wins,
/// positive before negative.
pub fn class_id_weight(element: ElementRef<'_>, config: &ScoreConfig) -> f64 {
    let el = element.value();
    let names = el.id().into_iter().chain(el.classes());

    for name in names {
        if POSITIVE_PATTERNS.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE_PATTERNS.is_match(name) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Whether a class/ID name marks an element as boilerplate.
pub fn is_unlikely_name(name: &str) -> bool {
    NEGATIVE_PATTERNS.is_match(name) && !POSITIVE_PATTERNS.is_match(name)
}

/// Points a text block contributes to its ancestors: one for existing, one
/// per comma, and one per `chars_per_point` characters up to a cap.
pub fn paragraph_score(text: &str, config: &ScoreConfig) -> f64 {
    let length_points =
        ((text.chars().count() / config.chars_per_point.max(1)) as f64).min(config.max_length_points);
    let comma_points = text.matches(',').count() as f64;
    1.0 + comma_points + length_points
}

/// Ratio of link text to total text, 0.0 to 1.0.
pub fn link_density(element: ElementRef<'_>) -> f64 {
    let text_length = element_text(element).chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_length: usize = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .map(|a| element_text(a).chars().count())
        .sum();

    (link_length as f64 / text_length as f64).min(1.0)
}
