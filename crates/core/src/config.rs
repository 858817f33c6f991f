//! Crawl configuration.
//!
//! A [`CrawlConfig`] is built once at startup with [`CrawlConfigBuilder`],
//! validated, and then shared read-only by every component for the rest of
//! the crawl.
//!
//! # Example
//!
//! ```rust
//! use sitemd_core::{CrawlConfig, OutputTarget};
//!
//! let config = CrawlConfig::builder()
//!     .start_url("https://docs.example.test/")
//!     .allowed_domain("docs.example.test")
//!     .exclude_filetype("zip")
//!     .output(OutputTarget::File("documentation.md".into()))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.excluded_filetypes, vec![".zip".to_string()]);
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use url::Url;

use crate::fetch::FetchConfig;
use crate::language::LanguageTarget;
use crate::markdown::MarkdownConfig;
use crate::readability::ReadabilityConfig;
use crate::{Result, SitemdError};

/// Where converted pages are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// One `<title>.md` file per page inside this directory.
    Directory(PathBuf),
    /// One aggregate document with a `##` section per page.
    File(PathBuf),
}

/// Order in which aggregate-mode sections are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendOrder {
    /// Sections follow the order pages were taken off the frontier,
    /// regardless of when their fetches complete.
    #[default]
    Discovery,
    /// Sections are appended as pages finish.
    Completion,
}

/// Read-only settings for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Seed URL.
    pub start_url: Url,
    /// Hosts links may point to (lowercase, no port).
    pub allowed_domains: BTreeSet<String>,
    /// Accept subdomains of allowed hosts as well.
    pub include_subdomains: bool,
    /// Lowercase path suffixes with a leading dot, e.g. `.zip`, `.rst.txt`.
    pub excluded_filetypes: Vec<String>,
    /// Output location and mode.
    pub output: OutputTarget,
    /// Optional cookie file handed to the HTTP fetcher.
    pub cookies_file: Option<PathBuf>,
    /// Language pages must be written in.
    pub target_language: LanguageTarget,
    /// Maximum number of pages in flight.
    pub concurrency: usize,
    /// Stop dequeuing after this many pages.
    pub max_pages: Option<usize>,
    /// Aggregate-mode append ordering.
    pub append_order: AppendOrder,
    /// HTTP settings.
    pub fetch: FetchConfig,
    /// Content extraction settings.
    pub readability: ReadabilityConfig,
    /// Markdown conversion settings.
    pub markdown: MarkdownConfig,
}

impl CrawlConfig {
    /// Creates a new builder for CrawlConfig.
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::new()
    }

    /// Checks the invariants every component relies on.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Configuration`] when the start URL is not
    /// http(s), the allowed-domain set is empty, or `concurrency` is zero.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.start_url.scheme(), "http" | "https") {
            return Err(SitemdError::Configuration(format!(
                "start URL must use http or https: {}",
                self.start_url
            )));
        }
        if self.start_url.host_str().is_none_or(str::is_empty) {
            return Err(SitemdError::Configuration(format!("start URL has no host: {}", self.start_url)));
        }
        if self.allowed_domains.is_empty() {
            return Err(SitemdError::Configuration("at least one allowed domain is required".to_string()));
        }
        if self.concurrency == 0 {
            return Err(SitemdError::Configuration("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for CrawlConfig.
///
/// Inputs are collected as given and normalized in [`build`](Self::build),
/// which is the only place configuration errors are raised.
#[derive(Debug, Clone)]
pub struct CrawlConfigBuilder {
    start_url: Option<String>,
    allowed_domains: Vec<String>,
    include_subdomains: bool,
    excluded_filetypes: Vec<String>,
    output: Option<OutputTarget>,
    cookies_file: Option<PathBuf>,
    target_language: String,
    concurrency: usize,
    max_pages: Option<usize>,
    append_order: AppendOrder,
    fetch: FetchConfig,
    readability: ReadabilityConfig,
    markdown: MarkdownConfig,
}

impl CrawlConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            start_url: None,
            allowed_domains: Vec::new(),
            include_subdomains: false,
            excluded_filetypes: Vec::new(),
            output: None,
            cookies_file: None,
            target_language: "en".to_string(),
            concurrency: 8,
            max_pages: None,
            append_order: AppendOrder::default(),
            fetch: FetchConfig::default(),
            readability: ReadabilityConfig::default(),
            markdown: MarkdownConfig::default(),
        }
    }

    /// Sets the seed URL.
    pub fn start_url(mut self, value: impl Into<String>) -> Self {
        self.start_url = Some(value.into());
        self
    }

    /// Adds one allowed domain (bare host or URL).
    pub fn allowed_domain(mut self, value: impl Into<String>) -> Self {
        self.allowed_domains.push(value.into());
        self
    }

    /// Adds several allowed domains.
    pub fn allowed_domains<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains.extend(values.into_iter().map(Into::into));
        self
    }

    /// Sets whether subdomains of allowed hosts are accepted.
    pub fn include_subdomains(mut self, value: bool) -> Self {
        self.include_subdomains = value;
        self
    }

    /// Adds one excluded filetype (`zip`, `.zip` or `rst.txt`).
    pub fn exclude_filetype(mut self, value: impl Into<String>) -> Self {
        self.excluded_filetypes.push(value.into());
        self
    }

    /// Adds several excluded filetypes.
    pub fn exclude_filetypes<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_filetypes.extend(values.into_iter().map(Into::into));
        self
    }

    /// Sets the output target.
    pub fn output(mut self, value: OutputTarget) -> Self {
        self.output = Some(value);
        self
    }

    /// Sets the cookie file.
    pub fn cookies_file(mut self, value: Option<PathBuf>) -> Self {
        self.cookies_file = value;
        self
    }

    /// Sets the target language code (ISO 639-1 or 639-3).
    pub fn target_language(mut self, value: impl Into<String>) -> Self {
        self.target_language = value.into();
        self
    }

    /// Sets the number of pages processed concurrently.
    pub fn concurrency(mut self, value: usize) -> Self {
        self.concurrency = value;
        self
    }

    /// Caps the number of pages taken off the frontier.
    pub fn max_pages(mut self, value: Option<usize>) -> Self {
        self.max_pages = value;
        self
    }

    /// Sets the aggregate-mode append ordering.
    pub fn append_order(mut self, value: AppendOrder) -> Self {
        self.append_order = value;
        self
    }

    /// Sets the HTTP settings.
    pub fn fetch(mut self, value: FetchConfig) -> Self {
        self.fetch = value;
        self
    }

    /// Sets the content extraction settings.
    pub fn readability(mut self, value: ReadabilityConfig) -> Self {
        self.readability = value;
        self
    }

    /// Sets the Markdown conversion settings.
    pub fn markdown(mut self, value: MarkdownConfig) -> Self {
        self.markdown = value;
        self
    }

    /// Normalizes inputs and builds a validated config.
    ///
    /// When no allowed domain was given, the start URL's host is used.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Configuration`] for a missing or invalid start
    /// URL, an empty domain set, a missing output target or an unknown
    /// language code.
    pub fn build(self) -> Result<CrawlConfig> {
        let raw_start = self.start_url.as_deref().map(str::trim).unwrap_or_default();
        if raw_start.is_empty() {
            return Err(SitemdError::Configuration("a start URL is required".to_string()));
        }
        let start_url = Url::parse(raw_start)
            .map_err(|e| SitemdError::Configuration(format!("invalid start URL {raw_start:?}: {e}")))?;

        let mut allowed_domains: BTreeSet<String> =
            self.allowed_domains.iter().filter_map(|d| parse_domain(d)).collect();
        if self.allowed_domains.is_empty()
            && let Some(host) = start_url.host_str()
        {
            allowed_domains.insert(host.to_lowercase());
        }

        let excluded_filetypes = normalize_filetypes(&self.excluded_filetypes);

        let output = self
            .output
            .ok_or_else(|| SitemdError::Configuration("an output file or directory is required".to_string()))?;

        let target_language = LanguageTarget::parse(&self.target_language)?;

        let config = CrawlConfig {
            start_url,
            allowed_domains,
            include_subdomains: self.include_subdomains,
            excluded_filetypes,
            output,
            cookies_file: self.cookies_file,
            target_language,
            concurrency: self.concurrency,
            max_pages: self.max_pages,
            append_order: self.append_order,
            fetch: self.fetch,
            readability: self.readability,
            markdown: self.markdown,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for CrawlConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a domain from either a URL or a plain host string.
///
/// Returns the lowercase host without port, or `None` for blank input.
///
/// ```rust
/// use sitemd_core::config::parse_domain;
///
/// assert_eq!(parse_domain("https://Docs.Example.test/guide"), Some("docs.example.test".to_string()));
/// assert_eq!(parse_domain("example.test:8080"), Some("example.test".to_string()));
/// assert_eq!(parse_domain("  "), None);
/// ```
pub fn parse_domain(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.contains("://")
        && let Ok(url) = Url::parse(value)
    {
        return url.host_str().map(str::to_lowercase);
    }

    let host = value.split('/').next().unwrap_or(value);
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    let host = host.trim_end_matches('.').to_lowercase();
    if host.is_empty() { None } else { Some(host) }
}

/// Normalizes filetype exclusions to lowercase, dot-prefixed suffixes.
///
/// Comma-separated entries are split, blanks dropped, duplicates removed.
pub fn normalize_filetypes(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values.iter().flat_map(|v| v.split(',')) {
        let trimmed = value.trim().trim_start_matches('*').trim_start_matches('.').to_lowercase();
        if trimmed.is_empty() {
            continue;
        }
        let suffix = format!(".{trimmed}");
        if !out.contains(&suffix) {
            out.push(suffix);
        }
    }
    out
}
