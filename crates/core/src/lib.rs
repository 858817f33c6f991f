pub mod classify;
pub mod config;
pub mod cookies;
pub mod crawler;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod language;
pub mod markdown;
pub mod parse;
pub mod pipeline;
pub mod preprocess;
pub mod readability;
pub mod scoring;
pub mod sink;

pub use classify::{UrlClassifier, is_crawlable, resolve_link};
pub use config::{AppendOrder, CrawlConfig, CrawlConfigBuilder, OutputTarget};
pub use cookies::{CookieRecord, load_cookie_file};
pub use crawler::{CrawlController, CrawlHandle, CrawlReport};
pub use error::{Result, SitemdError};
#[cfg(feature = "fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchConfig, Fetcher, Response};
pub use frontier::{Frontier, PushOutcome, QueuedUrl};
pub use language::{LanguageTarget, check_language, detect_language, is_target_language};
pub use markdown::{MarkdownConfig, convert_to_markdown, to_markdown};
pub use parse::Document;
pub use pipeline::{PageOutcome, PagePipeline, PageResult};
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;
pub use readability::{Extracted, Readability, ReadabilityConfig, extract, is_html_content_type};
#[doc(hidden)]
pub use scoring::ScoreConfig;
pub use sink::{AggregateSink, OutputSink, PerPageSink, SinkOutcome, sanitize_filename};
