//! Crawl controller.
//!
//! [`CrawlController`] owns the frontier and the output sink for one run.
//! It keeps up to `concurrency` pages in flight; each page is fetched, run
//! through the [`PagePipeline`] on a blocking worker, committed to the sink,
//! and its outbound links are classified and offered to the frontier.
//!
//! # Example
//!
//! ```rust,no_run
//! use sitemd_core::{CrawlConfig, CrawlController, HttpFetcher, OutputTarget};
//!
//! # async fn run() -> sitemd_core::Result<()> {
//! let config = CrawlConfig::builder()
//!     .start_url("https://docs.example.test/")
//!     .output(OutputTarget::Directory("out".into()))
//!     .build()?;
//! let fetcher = HttpFetcher::for_crawl(&config)?;
//! let report = CrawlController::new(config, fetcher).run().await?;
//! println!("{} pages written", report.pages_written);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinSet;
use url::Url;

use crate::classify::{UrlClassifier, normalize_url, resolve_link};
use crate::config::CrawlConfig;
use crate::fetch::Fetcher;
use crate::frontier::{Frontier, PushOutcome, QueuedUrl};
use crate::pipeline::PagePipeline;
use crate::sink::{OutputSink, SinkOutcome};
use crate::{Result, SitemdError};

/// Counters collected over one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Responses received from the fetcher
    pub pages_fetched: usize,
    /// Pages persisted by the sink
    pub pages_written: usize,
    /// Responses that were not HTML
    pub skipped_non_html: usize,
    /// Pages the extractor could not reduce
    pub extraction_failures: usize,
    /// Pages rejected by the language filter
    pub language_rejections: usize,
    /// Redirect responses whose target was offered to the frontier
    pub redirects_followed: usize,
    /// Responses dropped because a redirect left the crawl or hit a visited URL
    pub redirects_skipped: usize,
    /// URLs that could not be fetched
    pub fetch_failures: usize,
    /// Failed sink writes
    pub write_failures: usize,
    /// Distinct URLs added to the frontier, seed included
    pub links_enqueued: usize,
    /// Whether the crawl stopped on a shutdown request
    pub interrupted: bool,
    /// Wall-clock run time
    pub duration_ms: u64,
}

impl CrawlReport {
    /// Pages skipped for any content reason.
    pub fn pages_skipped(&self) -> usize {
        self.skipped_non_html + self.extraction_failures + self.language_rejections + self.redirects_skipped
    }

    fn record_skip(&mut self, url: &Url, err: &SitemdError) {
        match err {
            SitemdError::UnsupportedContentType { .. } => {
                self.skipped_non_html += 1;
                tracing::debug!(%url, "{err}");
            }
            SitemdError::ExtractionParse { .. } => {
                self.extraction_failures += 1;
                tracing::warn!(%url, "{err}");
            }
            SitemdError::LanguageDetection { .. } | SitemdError::LanguageMismatch { .. } => {
                self.language_rejections += 1;
                tracing::info!(%url, "{err}");
            }
            SitemdError::Redirect { .. } => {
                self.redirects_skipped += 1;
                tracing::info!(%url, "{err}");
            }
            _ => {
                self.fetch_failures += 1;
                tracing::warn!(%url, "{err}");
            }
        }
    }
}

/// Cloneable handle for stopping a running crawl.
///
/// Shutdown is cooperative: no new URLs are dequeued and pages already in
/// flight run to completion.
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    frontier: Arc<Frontier>,
}

impl CrawlHandle {
    pub fn shutdown(&self) {
        if !self.frontier.is_shutdown() {
            tracing::info!("Shutdown requested, draining in-flight pages");
        }
        self.frontier.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.frontier.is_shutdown()
    }
}

/// The result of visiting one dequeued URL.
struct Visit {
    url: Url,
    /// Final URL of the response; absent when the fetch failed.
    base: Option<Url>,
    error: Option<SitemdError>,
    links: Option<Vec<String>>,
    /// The response was a redirect whose target is carried in `links`.
    redirected: bool,
    sink: Result<SinkOutcome>,
}

/// Drives one crawl from the seed URL until the frontier is exhausted.
pub struct CrawlController<F: Fetcher> {
    config: Arc<CrawlConfig>,
    fetcher: Arc<F>,
    frontier: Arc<Frontier>,
    pipeline: Arc<PagePipeline>,
}

impl<F: Fetcher> CrawlController<F> {
    pub fn new(config: CrawlConfig, fetcher: F) -> Self {
        let pipeline = Arc::new(PagePipeline::from_config(&config));
        Self { config: Arc::new(config), fetcher: Arc::new(fetcher), frontier: Arc::new(Frontier::new()), pipeline }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle { frontier: Arc::clone(&self.frontier) }
    }

    /// Runs the crawl to completion.
    ///
    /// Per-page failures are counted in the report and never stop the
    /// crawl.
    ///
    /// # Errors
    ///
    /// - [`SitemdError::Configuration`] before anything is fetched when the
    ///   configuration is invalid.
    /// - [`SitemdError::Write`] when the output cannot be opened, or when
    ///   the aggregate document becomes unwritable mid-crawl. In-flight
    ///   pages are drained first.
    pub async fn run(&self) -> Result<CrawlReport> {
        self.config.validate()?;
        let started = Instant::now();

        let sink = Arc::new(OutputSink::open(&self.config.output, self.config.append_order)?);
        let classifier = UrlClassifier::from_config(&self.config);
        let mut report = CrawlReport::default();
        let mut fatal: Option<SitemdError> = None;

        tracing::info!(
            start_url = %self.config.start_url,
            domains = ?self.config.allowed_domains,
            concurrency = self.config.concurrency,
            "Starting crawl"
        );
        if self.frontier.push(self.config.start_url.clone()) == PushOutcome::Enqueued {
            report.links_enqueued += 1;
        }

        let mut in_flight = JoinSet::new();
        let mut tasks: HashMap<tokio::task::Id, QueuedUrl> = HashMap::new();
        loop {
            while in_flight.len() < self.config.concurrency && !self.page_limit_reached() {
                let Some(queued) = self.frontier.pop() else {
                    break;
                };
                tracing::debug!(seq = queued.seq, url = %queued.url, "Dequeued");
                let task = in_flight.spawn(visit(
                    Arc::clone(&self.config),
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.frontier),
                    Arc::clone(&self.pipeline),
                    Arc::clone(&sink),
                    queued.clone(),
                ));
                tasks.insert(task.id(), queued);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            let done = match joined {
                Ok((id, done)) => {
                    tasks.remove(&id);
                    done
                }
                Err(err) => {
                    let Some(QueuedUrl { seq, url }) = tasks.remove(&err.id()) else {
                        tracing::error!("Page task failed: {err}");
                        continue;
                    };
                    // The task never committed its slot; release it so
                    // ordered output keeps flowing.
                    let error = SitemdError::Fetch { url: url.to_string(), reason: format!("page task failed: {err}") };
                    Visit {
                        url,
                        base: None,
                        error: Some(error),
                        links: None,
                        redirected: false,
                        sink: sink.commit(seq, None),
                    }
                }
            };

            if done.base.is_some() {
                report.pages_fetched += 1;
            }
            if done.redirected {
                report.redirects_followed += 1;
            }
            if let Some(err) = &done.error {
                report.record_skip(&done.url, err);
            }

            match done.sink {
                Ok(outcome) => {
                    report.pages_written += outcome.written.len();
                    report.write_failures += outcome.failed;
                    for path in &outcome.written {
                        tracing::info!(path = %path.display(), "Saved page");
                    }
                }
                Err(err) => {
                    report.write_failures += 1;
                    if fatal.is_none() {
                        tracing::error!("{err}; stopping crawl");
                        self.frontier.shutdown();
                        fatal = Some(err);
                    }
                }
            }

            if fatal.is_none()
                && let (Some(base), Some(links)) = (&done.base, &done.links)
            {
                report.links_enqueued += self.enqueue_links(&classifier, base, links);
            }
        }

        if let Some(err) = fatal {
            return Err(err);
        }

        report.interrupted = self.frontier.is_shutdown();
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            fetched = report.pages_fetched,
            written = report.pages_written,
            skipped = report.pages_skipped(),
            failed = report.fetch_failures,
            "Crawl finished"
        );
        Ok(report)
    }

    /// Classifies, resolves and offers each link; returns how many were new.
    fn enqueue_links(&self, classifier: &UrlClassifier<'_>, base: &Url, links: &[String]) -> usize {
        let mut enqueued = 0;
        for href in links {
            if !classifier.is_crawlable(href) {
                continue;
            }
            let Some(url) = resolve_link(base, href) else {
                continue;
            };
            if !classifier.is_crawlable_url(&url) {
                continue;
            }
            match self.frontier.push(url) {
                PushOutcome::Enqueued => enqueued += 1,
                PushOutcome::Duplicate => {}
                PushOutcome::ShuttingDown => break,
            }
        }
        tracing::debug!(%base, found = links.len(), enqueued, "Enumerated links");
        enqueued
    }

    fn page_limit_reached(&self) -> bool {
        self.config.max_pages.is_some_and(|max| self.frontier.dequeued() >= max)
    }
}

/// Fetches and processes one URL, then commits its outcome to the sink.
///
/// Every dequeued sequence number is committed exactly once, whatever
/// happens to the page.
async fn visit<F: Fetcher>(
    config: Arc<CrawlConfig>, fetcher: Arc<F>, frontier: Arc<Frontier>, pipeline: Arc<PagePipeline>,
    sink: Arc<OutputSink>, queued: QueuedUrl,
) -> Visit {
    let QueuedUrl { seq, url } = queued;
    tracing::info!(%url, "Fetching");

    let response = match fetcher.fetch(&url).await {
        Ok(response) => response,
        Err(err) => {
            let sink = commit_skipped(sink, seq).await;
            return Visit { url, base: None, error: Some(err), links: None, redirected: false, sink };
        }
    };

    if let Some(reason) = redirect_rejection(&config, &frontier, &url, &response.url) {
        let error = SitemdError::Redirect { url: url.to_string(), target: response.url.to_string(), reason };
        let sink = commit_skipped(sink, seq).await;
        return Visit { url, base: None, error: Some(error), links: None, redirected: false, sink };
    }

    if let Some(location) = response.redirect_location() {
        tracing::debug!(%url, %location, "Redirect");
        let links = Some(vec![location.to_string()]);
        let sink = commit_skipped(sink, seq).await;
        return Visit { url, base: Some(response.url), error: None, links, redirected: true, sink };
    }

    let base = response.url.clone();
    let worker_sink = Arc::clone(&sink);
    let processed = tokio::task::spawn_blocking(move || {
        let outcome = pipeline.process(&response);
        let (page, error) = match outcome.result {
            Ok(page) => (Some(page), None),
            Err(err) => (None, Some(err)),
        };
        let committed = worker_sink.commit(seq, page);
        (error, outcome.links, committed)
    })
    .await;

    match processed {
        Ok((error, links, sink)) => Visit { url, base: Some(base), error, links, redirected: false, sink },
        Err(err) => {
            tracing::error!(%url, "Processing task failed: {err}");
            let sink = sink.commit(seq, None);
            Visit { url, base: Some(base), error: None, links: None, redirected: false, sink }
        }
    }
}

/// Why a response that landed on `landed` after a redirect must be dropped.
///
/// The target has to pass the same filter as a discovered link, and it is
/// claimed in the frontier so the page is processed once even when it is
/// also linked directly.
fn redirect_rejection(config: &CrawlConfig, frontier: &Frontier, requested: &Url, landed: &Url) -> Option<String> {
    if normalize_url(requested) == normalize_url(landed) {
        return None;
    }
    if !UrlClassifier::from_config(config).is_crawlable_url(landed) {
        return Some("outside the allowed domains".to_string());
    }
    if !frontier.claim(landed) {
        return Some("already visited".to_string());
    }
    tracing::debug!(from = %requested, to = %landed, "Followed redirect");
    None
}

/// Commits a URL that produced no page.
async fn commit_skipped(sink: Arc<OutputSink>, seq: usize) -> Result<SinkOutcome> {
    let worker_sink = Arc::clone(&sink);
    match tokio::task::spawn_blocking(move || worker_sink.commit(seq, None)).await {
        Ok(result) => result,
        Err(_) => sink.commit(seq, None),
    }
}
