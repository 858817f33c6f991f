//! URL classification: which discovered links are worth fetching.
//!
//! Classification is a pure function of the candidate string and the
//! configured constraints. It never touches the network.

use std::collections::BTreeSet;

use url::Url;

use crate::CrawlConfig;

/// Schemes a crawlable URL may carry. Relative references have none.
const CRAWLABLE_SCHEMES: &[&str] = &["http", "https"];

/// Decides whether a link is crawlable under the given constraints.
///
/// * the scheme must be absent (relative reference), `http` or `https`
/// * an absolute or scheme-relative URL must name an allowed host exactly
/// * the path must not end with an excluded suffix (case-insensitive)
///
/// Relative references without a host inherit the host of the page they
/// were found on, which was itself allowed, so only their path is checked.
///
/// ```rust
/// use std::collections::BTreeSet;
/// use sitemd_core::classify::is_crawlable;
///
/// let domains: BTreeSet<String> = ["example.test".to_string()].into();
/// let excluded = vec![".zip".to_string()];
/// assert!(is_crawlable("https://example.test/guide", &domains, &excluded));
/// assert!(is_crawlable("../intro.html", &domains, &excluded));
/// assert!(!is_crawlable("mailto:team@example.test", &domains, &excluded));
/// assert!(!is_crawlable("https://other.test/", &domains, &excluded));
/// assert!(!is_crawlable("/files/release.ZIP", &domains, &excluded));
/// ```
pub fn is_crawlable(candidate: &str, allowed_domains: &BTreeSet<String>, excluded_filetypes: &[String]) -> bool {
    UrlClassifier::new(allowed_domains, false, excluded_filetypes).is_crawlable(candidate)
}

/// Reusable classifier bound to one set of constraints.
#[derive(Debug, Clone, Copy)]
pub struct UrlClassifier<'a> {
    allowed_domains: &'a BTreeSet<String>,
    include_subdomains: bool,
    excluded_filetypes: &'a [String],
}

impl<'a> UrlClassifier<'a> {
    /// Creates a classifier. `excluded_filetypes` must already be
    /// normalized to lowercase suffixes (see [`crate::config::normalize_filetypes`]).
    pub fn new(
        allowed_domains: &'a BTreeSet<String>, include_subdomains: bool, excluded_filetypes: &'a [String],
    ) -> Self {
        Self { allowed_domains, include_subdomains, excluded_filetypes }
    }

    /// Creates a classifier from a crawl configuration.
    pub fn from_config(config: &'a CrawlConfig) -> Self {
        Self::new(&config.allowed_domains, config.include_subdomains, &config.excluded_filetypes)
    }

    /// Classifies a raw `href` value.
    pub fn is_crawlable(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();

        match Url::parse(candidate) {
            Ok(url) => self.is_crawlable_url(&url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                if candidate.starts_with("//") {
                    return match Url::parse(&format!("http:{candidate}")) {
                        Ok(url) => self.is_crawlable_url(&url),
                        Err(_) => false,
                    };
                }
                let path = candidate.split(['?', '#']).next().unwrap_or_default();
                !self.has_excluded_suffix(path)
            }
            Err(_) => false,
        }
    }

    /// Classifies an absolute URL.
    pub fn is_crawlable_url(&self, url: &Url) -> bool {
        if !CRAWLABLE_SCHEMES.contains(&url.scheme()) {
            return false;
        }
        match url.host_str() {
            Some(host) if self.is_allowed_host(host) => {}
            _ => return false,
        }
        !self.has_excluded_suffix(url.path())
    }

    /// Exact host match, or a dot-separated suffix match when subdomains
    /// are enabled.
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if self.allowed_domains.contains(&host) {
            return true;
        }
        self.include_subdomains
            && self
                .allowed_domains
                .iter()
                .any(|domain| host.len() > domain.len() && host.ends_with(domain.as_str()) && {
                    let cut = host.len() - domain.len();
                    host.as_bytes()[cut - 1] == b'.'
                })
    }

    fn has_excluded_suffix(&self, path: &str) -> bool {
        if self.excluded_filetypes.is_empty() {
            return false;
        }
        let path = path.to_lowercase();
        self.excluded_filetypes.iter().any(|suffix| path.ends_with(suffix.as_str()))
    }
}

/// Resolves `href` against the page it was found on and drops the fragment.
///
/// The returned URL is the frontier's dedup key, so `page#a` and `page#b`
/// collapse to one entry.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let mut url = base.join(href.trim()).ok()?;
    url.set_fragment(None);
    Some(url)
}

/// Normalizes a URL for visited-set comparisons.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
