//! HTML to Markdown conversion.
//!
//! Conversion itself is delegated to `htmd`; this module only prepares the
//! fragment and tidies the result.

/// Configuration for Markdown conversion
#[derive(Debug, Clone, Default)]
pub struct MarkdownConfig {
    /// Strip images from output
    pub strip_images: bool,
}

/// Convert an extracted HTML fragment to Markdown with default settings
///
/// ```rust
/// use sitemd_core::to_markdown;
///
/// let md = to_markdown("<h2>Install</h2><p>Run <code>cargo build</code>.</p>");
/// assert!(md.contains("## Install"));
/// assert!(md.contains("`cargo build`"));
/// ```
pub fn to_markdown(html: &str) -> String {
    convert_to_markdown(html, &MarkdownConfig::default())
}

/// Convert an HTML fragment to Markdown
pub fn convert_to_markdown(html: &str, config: &MarkdownConfig) -> String {
    let processed_html = if config.strip_images { strip_images(html) } else { html.to_string() };
    html_to_markdown(&processed_html).trim_end().to_string()
}

/// Convert HTML to Markdown using htmd crate
fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_default()
}

/// Strip all img tags from HTML
fn strip_images(html: &str) -> String {
    let mut output = Vec::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("img", |el| {
                el.remove();
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| html.to_string())
}
