//! Per-page processing: extract, language check, convert.
//!
//! [`PagePipeline::process`] is a pure function of one fetched [`Response`]
//! and read-only configuration. It never touches the frontier or the sink;
//! the controller decides what to do with the outcome.

use url::Url;

use crate::config::CrawlConfig;
use crate::fetch::Response;
use crate::language::{LanguageTarget, check_language};
use crate::markdown::{MarkdownConfig, convert_to_markdown};
use crate::parse::Document;
use crate::readability::Readability;
use crate::{Result, SitemdError};

/// A successfully processed page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Final URL of the page after redirects
    pub url: Url,
    /// Page title used for the heading and file name
    pub title: String,
    /// Extracted HTML fragment
    pub html: String,
    /// Markdown body
    pub markdown: String,
}

/// What processing one response produced.
#[derive(Debug)]
pub struct PageOutcome {
    /// The converted page, or why it was skipped.
    pub result: Result<PageResult>,
    /// Raw anchor `href` values in document order. `None` when the response
    /// was not HTML, in which case nothing may be followed from it.
    pub links: Option<Vec<String>>,
}

/// Extraction, language filter and Markdown conversion for one page.
#[derive(Debug, Clone)]
pub struct PagePipeline {
    readability: Readability,
    language: LanguageTarget,
    markdown: MarkdownConfig,
}

impl PagePipeline {
    pub fn new(readability: Readability, language: LanguageTarget, markdown: MarkdownConfig) -> Self {
        Self { readability, language, markdown }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            Readability::with_config(config.readability.clone()),
            config.target_language,
            config.markdown.clone(),
        )
    }

    /// Processes one fetched response.
    ///
    /// Links are enumerated from the raw response whenever it is HTML, even
    /// when extraction or the language check rejects the page.
    pub fn process(&self, response: &Response) -> PageOutcome {
        let extracted = match self.readability.extract(&response.body, response.content_type(), &response.url) {
            Ok(extracted) => extracted,
            Err(err @ SitemdError::UnsupportedContentType { .. }) => {
                return PageOutcome { result: Err(err), links: None };
            }
            Err(err) => return PageOutcome { result: Err(err), links: Some(raw_links(response)) },
        };

        let links = Some(raw_links(response));
        if let Err(err) = check_language(&extracted.content, self.language, response.url.as_str()) {
            return PageOutcome { result: Err(err), links };
        }

        let markdown = convert_to_markdown(&extracted.content, &self.markdown);
        let page = PageResult { url: response.url.clone(), title: extracted.title, html: extracted.content, markdown };
        PageOutcome { result: Ok(page), links }
    }
}

fn raw_links(response: &Response) -> Vec<String> {
    Document::parse(&response.body).links()
}
