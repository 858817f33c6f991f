//! Error types for crawl operations.
//!
//! This module defines the main error type [`SitemdError`]. Most variants
//! describe why a single page was skipped; only configuration errors and
//! aggregate-mode write failures stop a crawl (see [`SitemdError::is_fatal`]).
//!
//! # Example
//!
//! ```rust
//! use sitemd_core::{SitemdError, Result};
//!
//! fn require_domains(domains: &[String]) -> Result<()> {
//!     if domains.is_empty() {
//!         return Err(SitemdError::Configuration("no allowed domains".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for crawling, extraction and output.
#[derive(Error, Debug)]
pub enum SitemdError {
    /// Missing or invalid crawl configuration.
    ///
    /// Raised before the first fetch; aborts the crawl.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The response is not an HTML document.
    ///
    /// No extraction is attempted and no links are followed from it.
    #[error("Unsupported content type {content_type:?} for {url}")]
    UnsupportedContentType { url: String, content_type: Option<String> },

    /// The readability heuristic could not produce a fragment.
    #[error("Failed to extract content from {url}: {reason}")]
    ExtractionParse { url: String, reason: String },

    /// The language detector gave no answer for the page text.
    #[error("Language detection failed for {url}: {reason}")]
    LanguageDetection { url: String, reason: String },

    /// The detected language is not the configured target.
    #[error("Skipping {url}: detected language {detected}, expected {target}")]
    LanguageMismatch { url: String, detected: String, target: String },

    /// Network, transport or HTTP status failure reported by the fetcher.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The response came from a redirect target the crawl will not process:
    /// outside the allowed domains, or a URL already claimed by another visit.
    #[error("Skipping {url}: redirected to {target} ({reason})")]
    Redirect { url: String, target: String, reason: String },

    /// Request timeout.
    #[error("Request to {url} timed out after {timeout} seconds")]
    Timeout { url: String, timeout: u64 },

    /// Filesystem error while persisting output.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cookie file could not be read or parsed.
    #[error("Invalid cookie file {}: {reason}", path.display())]
    CookieFile { path: PathBuf, reason: String },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl SitemdError {
    /// Whether this error ends the crawl instead of skipping one page.
    ///
    /// Write failures are only fatal when raised by the aggregate sink; the
    /// per-page sink logs them and keeps going, so it never hands them to
    /// the controller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SitemdError::Configuration(_) | SitemdError::CookieFile { .. } | SitemdError::Write { .. })
    }

    /// Short, stable label used for logs and crawl reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SitemdError::Configuration(_) => "configuration",
            SitemdError::UnsupportedContentType { .. } => "unsupported_content_type",
            SitemdError::ExtractionParse { .. } => "extraction_parse",
            SitemdError::LanguageDetection { .. } => "language_detection",
            SitemdError::LanguageMismatch { .. } => "language_mismatch",
            SitemdError::Fetch { .. } | SitemdError::Timeout { .. } => "fetch",
            SitemdError::Redirect { .. } => "redirect",
            SitemdError::Write { .. } => "write",
            SitemdError::CookieFile { .. } => "cookie_file",
            SitemdError::InvalidUrl(_) => "invalid_url",
            #[cfg(feature = "fetch")]
            SitemdError::HttpError(_) => "fetch",
        }
    }
}

/// Result type alias for SitemdError.
pub type Result<T> = std::result::Result<T, SitemdError>;
