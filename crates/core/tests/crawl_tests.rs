//! Crawl controller integration tests
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use sitemd_core::*;
use tempfile::TempDir;
use url::Url;

const ENGLISH: &str = "This section describes how the command line interface loads its settings, how the \
    defaults can be overridden with environment variables, and what happens when a key is missing.";

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

struct Page {
    content_type: &'static str,
    body: String,
    delay: Duration,
}

/// Serves canned pages and records every requested URL.
#[derive(Default)]
struct MemoryFetcher {
    pages: HashMap<String, Page>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn html(self, url: &str, body: String) -> Self {
        self.serve(url, "text/html; charset=utf-8", body, Duration::ZERO)
    }

    fn serve(mut self, url: &str, content_type: &'static str, body: String, delay: Duration) -> Self {
        self.pages.insert(url.to_string(), Page { content_type, body, delay });
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> Result<Response> {
        self.requested.lock().unwrap().push(url.to_string());
        let Some(page) = self.pages.get(url.as_str()) else {
            return Err(SitemdError::Fetch { url: url.to_string(), reason: "HTTP status 404 Not Found".to_string() });
        };
        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }
        Ok(Response::new(url.clone(), 200, [("Content-Type", page.content_type)], page.body.as_str()))
    }
}

fn article(title: &str, links: &[&str]) -> String {
    let anchors: String = links.iter().map(|href| format!(r#"<li><a href="{href}">{href}</a></li>"#)).collect();
    format!(
        "<html><head><title>{title}</title></head><body>\
         <nav><ul>{anchors}</ul></nav>\
         <article><h1>{title}</h1><p>{ENGLISH}</p><p>{ENGLISH}</p></article>\
         </body></html>"
    )
}

fn per_page_config(dir: &Path, start: &str) -> CrawlConfigBuilder {
    CrawlConfig::builder().start_url(start).output(OutputTarget::Directory(dir.to_path_buf()))
}

fn markdown_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".md"))
        .collect();
    names.sort();
    names
}

fn section_headings(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| line.starts_with("## "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_seed_page_is_converted_and_only_allowed_links_followed() {
    let dir = TempDir::new().unwrap();
    let fetcher = MemoryFetcher::default().html(
        "https://example.test/",
        article("Welcome", &["https://example.test/page2", "https://other.test/x"]),
    );
    let config = per_page_config(dir.path(), "https://example.test/")
        .allowed_domain("example.test")
        .build()
        .unwrap();

    let controller = CrawlController::new(config, fetcher);
    let report = controller.run().await.unwrap();

    assert_eq!(markdown_files(dir.path()), vec!["Welcome.md"]);
    let content = fs::read_to_string(dir.path().join("Welcome.md")).unwrap();
    assert!(content.starts_with("# Welcome\n\n"));
    assert!(content.contains("environment variables"));

    assert!(controller.frontier().contains(&Url::parse("https://example.test/page2").unwrap()));
    assert!(!controller.frontier().contains(&Url::parse("https://other.test/x").unwrap()));
    assert_eq!(report.links_enqueued, 2);
    assert_eq!(report.pages_written, 1);
    assert_eq!(report.fetch_failures, 1);
}

#[tokio::test]
async fn test_text_plain_is_not_extracted_and_contributes_no_links() {
    let dir = TempDir::new().unwrap();
    let fetcher = MemoryFetcher::default().serve(
        "https://example.test/",
        "text/plain",
        article("Plain", &["/hidden"]),
        Duration::ZERO,
    );
    let config = per_page_config(dir.path(), "https://example.test/").build().unwrap();

    let controller = CrawlController::new(config, fetcher);
    let report = controller.run().await.unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.skipped_non_html, 1);
    assert_eq!(report.links_enqueued, 1);
    assert!(markdown_files(dir.path()).is_empty());
    assert!(!controller.frontier().contains(&Url::parse("https://example.test/hidden").unwrap()));
}

#[tokio::test]
async fn test_language_rejection_still_enqueues_links() {
    let dir = TempDir::new().unwrap();
    let german = fs::read_to_string(get_fixture_path("german_page.html")).unwrap();
    let fetcher = MemoryFetcher::default()
        .html("https://example.test/de/konfiguration.html", german)
        .html("https://example.test/de/api.html", article("API", &[]));
    let config = per_page_config(dir.path(), "https://example.test/de/konfiguration.html").build().unwrap();

    let controller = CrawlController::new(config, fetcher);
    let report = controller.run().await.unwrap();

    assert_eq!(report.language_rejections, 1);
    assert_eq!(markdown_files(dir.path()), vec!["API.md"]);
    assert!(controller.frontier().contains(&Url::parse("https://example.test/de/index.html").unwrap()));
}

#[tokio::test]
async fn test_empty_page_is_skipped_but_links_followed() {
    let dir = TempDir::new().unwrap();
    let empty = r#"<html><body><nav><a href="/next">Next</a></nav></body></html>"#.to_string();
    let fetcher = MemoryFetcher::default()
        .html("https://example.test/", empty)
        .html("https://example.test/next", article("Next", &[]));
    let config = per_page_config(dir.path(), "https://example.test/").build().unwrap();

    let report = CrawlController::new(config, fetcher).run().await.unwrap();

    assert_eq!(report.extraction_failures, 1);
    assert_eq!(report.pages_written, 1);
    assert_eq!(markdown_files(dir.path()), vec!["Next.md"]);
}

#[tokio::test]
async fn test_aggregate_sections_follow_discovery_order() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("site.md");
    let fetcher = MemoryFetcher::default()
        .html("https://example.test/", article("Index", &["/a", "/b", "/c"]))
        .serve("https://example.test/a", "text/html", article("A", &[]), Duration::from_millis(150))
        .serve("https://example.test/b", "text/html", article("B", &[]), Duration::from_millis(75))
        .serve("https://example.test/c", "text/html", article("C", &[]), Duration::ZERO);
    let config = CrawlConfig::builder()
        .start_url("https://example.test/")
        .output(OutputTarget::File(output.clone()))
        .concurrency(4)
        .build()
        .unwrap();

    let report = CrawlController::new(config, fetcher).run().await.unwrap();

    assert_eq!(report.pages_written, 4);
    assert_eq!(section_headings(&output), vec!["## Index", "## A", "## B", "## C"]);
    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("# Documentation\n\n## Index\n\n"));
}

#[tokio::test]
async fn test_aggregate_completion_order_writes_every_page() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("site.md");
    let fetcher = MemoryFetcher::default()
        .html("https://example.test/", article("Index", &["/a", "/b"]))
        .serve("https://example.test/a", "text/html", article("A", &[]), Duration::from_millis(100))
        .serve("https://example.test/b", "text/html", article("B", &[]), Duration::ZERO);
    let config = CrawlConfig::builder()
        .start_url("https://example.test/")
        .output(OutputTarget::File(output.clone()))
        .append_order(AppendOrder::Completion)
        .build()
        .unwrap();

    CrawlController::new(config, fetcher).run().await.unwrap();

    let mut headings = section_headings(&output);
    headings.sort();
    assert_eq!(headings, vec!["## A", "## B", "## Index"]);
}

#[tokio::test]
async fn test_aggregate_skips_failed_pages_without_stalling() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("site.md");
    let fetcher = MemoryFetcher::default()
        .html("https://example.test/", article("Index", &["/missing", "/plain", "/last"]))
        .serve("https://example.test/plain", "text/plain", "just text".to_string(), Duration::from_millis(50))
        .html("https://example.test/last", article("Last", &[]));
    let config = CrawlConfig::builder()
        .start_url("https://example.test/")
        .output(OutputTarget::File(output.clone()))
        .build()
        .unwrap();

    let report = CrawlController::new(config, fetcher).run().await.unwrap();

    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.skipped_non_html, 1);
    assert_eq!(section_headings(&output), vec!["## Index", "## Last"]);
}

#[tokio::test]
async fn test_sanitized_title_collision_last_writer_wins() {
    let dir = TempDir::new().unwrap();
    let fetcher = MemoryFetcher::default()
        .html("https://example.test/", article("Index", &["/one", "/two"]))
        .html("https://example.test/one", article("Guide: Setup", &[]))
        .html(
            "https://example.test/two",
            article("Guide/ Setup", &[]).replace("</article>", "<p>Second version of the page.</p></article>"),
        );
    let config = per_page_config(dir.path(), "https://example.test/").concurrency(1).build().unwrap();

    let report = CrawlController::new(config, fetcher).run().await.unwrap();

    assert_eq!(report.pages_written, 3);
    assert_eq!(markdown_files(dir.path()), vec!["Guide_ Setup.md", "Index.md"]);
    let content = fs::read_to_string(dir.path().join("Guide_ Setup.md")).unwrap();
    assert!(content.starts_with("# Guide/ Setup\n\n"));
    assert!(content.contains("Second version"));
}

#[tokio::test]
async fn test_documentation_fixture_crawl() {
    let dir = TempDir::new().unwrap();
    let seed = "https://docs.example.test/guide/configuration.html";
    let page = fs::read_to_string(get_fixture_path("docs_page.html")).unwrap();
    let fetcher = MemoryFetcher::default().html(seed, page);
    let config = per_page_config(dir.path(), seed)
        .allowed_domain("docs.example.test")
        .exclude_filetype("zip")
        .concurrency(1)
        .build()
        .unwrap();

    let controller = CrawlController::new(config, fetcher);
    let report = controller.run().await.unwrap();

    let content = fs::read_to_string(dir.path().join("Configuration.md")).unwrap();
    assert!(content.contains("## Loading order"));
    assert!(content.contains("toolkit.toml"));
    assert!(content.contains("(https://docs.example.test/guide/api/config.html)"));
    assert!(!content.contains("Copyright"));
    assert!(!content.contains("API reference"));

    let requested = controller.fetcher().requested();
    assert_eq!(requested.first().map(String::as_str), Some(seed));
    assert!(requested.contains(&"https://docs.example.test/guide/install.html".to_string()));
    assert!(requested.contains(&"https://docs.example.test/docs/deploy.html".to_string()));
    assert!(!requested.iter().any(|u| u.ends_with(".zip")));
    assert!(!requested.iter().any(|u| u.contains("sphinx-doc.org")));
    assert_eq!(requested.iter().filter(|u| u.contains("configuration.html")).count(), 1);
    assert_eq!(report.pages_written, 1);
}

#[tokio::test]
async fn test_invalid_config_fails_before_fetching() {
    let dir = TempDir::new().unwrap();

    let err = per_page_config(dir.path(), "").build().unwrap_err();
    assert!(matches!(err, SitemdError::Configuration(_)));

    let err = per_page_config(dir.path(), "https://example.test/").allowed_domains(["  "]).build().unwrap_err();
    assert!(matches!(err, SitemdError::Configuration(_)));

    let mut config = per_page_config(dir.path(), "https://example.test/").build().unwrap();
    config.allowed_domains.clear();
    let fetcher = MemoryFetcher::default().html("https://example.test/", article("Index", &[]));
    let controller = CrawlController::new(config, fetcher);
    let err = controller.run().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(markdown_files(dir.path()).is_empty());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_unwritable_aggregate_output_is_fatal() {
    let device = Path::new("/dev/full");
    if !device.exists() {
        return;
    }
    let config = CrawlConfig::builder()
        .start_url("https://example.test/")
        .output(OutputTarget::File(device.to_path_buf()))
        .build()
        .unwrap();
    let fetcher = MemoryFetcher::default().html("https://example.test/", article("Index", &[]));

    let err = CrawlController::new(config, fetcher).run().await.unwrap_err();
    assert!(matches!(err, SitemdError::Write { .. }));
}
