//! The fetcher boundary.
//!
//! The crawl controller only sees [`Response`] values produced by some
//! [`Fetcher`]. [`HttpFetcher`] is the reqwest-backed implementation used by
//! the CLI; tests plug in in-memory fetchers.

use std::collections::HashMap;
use std::future::Future;
#[cfg(feature = "fetch")]
use std::path::Path;
#[cfg(feature = "fetch")]
use std::sync::Arc;
#[cfg(feature = "fetch")]
use std::time::Duration;

use url::Url;

use crate::Result;
#[cfg(feature = "fetch")]
use crate::SitemdError;
#[cfg(feature = "fetch")]
use crate::config::CrawlConfig;
#[cfg(feature = "fetch")]
use crate::cookies::{CookieRecord, load_cookie_file};


/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: format!("Mozilla/5.0 (compatible; sitemd/{})", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A fetched page, validated once at the fetcher boundary.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL after redirects; relative links resolve against it.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response headers keyed by lowercase name.
    pub headers: HashMap<String, String>,
    /// Decoded response body.
    pub body: String,
}

impl Response {
    /// Creates a response, lowercasing header names.
    pub fn new<I, K, V>(url: Url, status: u16, headers: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = headers.into_iter().map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into())).collect();
        Self { url, status, headers, body: body.into() }
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The `Content-Type` header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// The `Location` of a 3xx response.
    pub fn redirect_location(&self) -> Option<&str> {
        if (300..400).contains(&self.status) { self.header("location") } else { None }
    }
}

/// Anything that can turn a URL into a [`Response`].
///
/// Implementations own timeouts, retries and transport errors; every
/// failure surfaces as an `Err` that the controller logs and skips.
///
/// A fetcher may either return 3xx responses as they are, in which case the
/// controller queues the `Location` like any discovered link, or follow
/// redirects itself and report the final URL in [`Response::url`].
pub trait Fetcher: Send + Sync + 'static {
    /// Fetches one URL.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Response>> + Send;
}

/// Fetcher backed by a shared reqwest client.
///
/// Redirects are not followed. The 3xx response is handed back so the crawl
/// can filter and deduplicate the target like any other link.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: u64,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    /// Builds a client from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Self::with_cookies(config, &[])
    }

    /// Builds a client whose cookie jar is seeded from a cookie file.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::CookieFile`] when the file cannot be read or
    /// parsed.
    pub fn with_cookie_file(config: &FetchConfig, path: &Path) -> Result<Self> {
        let cookies = load_cookie_file(path)?;
        tracing::info!("Loaded {} cookies from {}", cookies.len(), path.display());
        Self::with_cookies(config, &cookies)
    }

    /// Builds a client with the given cookies preloaded.
    pub fn with_cookies(config: &FetchConfig, cookies: &[CookieRecord]) -> Result<Self> {
        let jar = reqwest::cookie::Jar::default();
        for cookie in cookies {
            match cookie.origin() {
                Some(origin) => jar.add_cookie_str(&cookie.to_set_cookie(), &origin),
                None => tracing::warn!("Ignoring cookie {} with unusable domain {:?}", cookie.name, cookie.domain),
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::none())
            .cookie_provider(Arc::new(jar))
            .build()
            .map_err(SitemdError::HttpError)?;

        Ok(Self { client, timeout: config.timeout })
    }

    /// Builds the client a crawl runs with, seeding cookies from the
    /// configured cookie file if there is one.
    pub fn for_crawl(config: &CrawlConfig) -> Result<Self> {
        match &config.cookies_file {
            Some(path) => Self::with_cookie_file(&config.fetch, path),
            None => Self::new(&config.fetch),
        }
    }
}

#[cfg(feature = "fetch")]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Response> {
        let response = self
            .client
            .get(url.clone())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SitemdError::Timeout { url: url.to_string(), timeout: self.timeout }
                } else {
                    SitemdError::Fetch { url: url.to_string(), reason: e.to_string() }
                }
            })?;

        let status = response.status();
        if !status.is_success() && !status.is_redirection() {
            return Err(SitemdError::Fetch { url: url.to_string(), reason: format!("HTTP status {status}") });
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| SitemdError::Fetch { url: url.to_string(), reason: format!("failed to read body: {e}") })?;

        Ok(Response::new(final_url, status.as_u16(), headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("sitemd"));
    }

    #[test]
    fn test_response_headers_case_insensitive() {
        let response = Response::new(
            Url::parse("https://example.test/").unwrap(),
            200,
            [("Content-Type", "text/html; charset=utf-8")],
            "<html></html>",
        );
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("x-missing"), None);
        assert_eq!(response.redirect_location(), None);
    }

    #[test]
    fn test_redirect_location() {
        let url = Url::parse("https://example.test/old").unwrap();
        let moved = Response::new(url.clone(), 301, [("Location", "/new")], "");
        assert_eq!(moved.redirect_location(), Some("/new"));

        let created = Response::new(url, 201, [("Location", "/new")], "");
        assert_eq!(created.redirect_location(), None);
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(&FetchConfig::default()).is_ok());
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_http_fetcher_for_crawl_reads_cookie_file() {
        let config = CrawlConfig::builder()
            .start_url("https://docs.example.test/")
            .output(crate::config::OutputTarget::File("docs.md".into()))
            .cookies_file(Some("missing-cookies.json".into()))
            .build()
            .unwrap();
        assert!(matches!(HttpFetcher::for_crawl(&config), Err(SitemdError::CookieFile { .. })));

        let config = CrawlConfig { cookies_file: None, ..config };
        assert!(HttpFetcher::for_crawl(&config).is_ok());
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_http_fetcher_unreachable_host() {
        let fetcher = HttpFetcher::new(&FetchConfig { timeout: 2, ..Default::default() }).unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = tokio::runtime::Runtime::new().unwrap().block_on(fetcher.fetch(&url));
        assert!(matches!(result, Err(SitemdError::Fetch { .. }) | Err(SitemdError::Timeout { .. })));
    }
}
