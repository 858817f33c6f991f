use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use sitemd_core::{
    AppendOrder, CrawlConfig, CrawlController, FetchConfig, HttpFetcher, MarkdownConfig, OutputTarget,
};
use tracing_subscriber::EnvFilter;

mod echo;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crawl a documentation site and convert its pages to Markdown
#[derive(Parser, Debug)]
#[command(name = "sitemd")]
#[command(author = "sitemd Contributors")]
#[command(version)]
#[command(about = "Crawl a documentation site into Markdown", long_about = None)]
#[command(group(ArgGroup::new("target").required(true).args(["output", "output_dir"])))]
struct Args {
    /// URL the crawl starts from
    #[arg(short = 'u', long, value_name = "URL")]
    start_url: String,

    /// Domains links may point to (default: the start URL's host)
    #[arg(short = 'a', long, value_name = "DOMAIN", num_args = 1.., value_delimiter = ',')]
    allowed_domains: Vec<String>,

    /// File suffixes that are never fetched, e.g. zip,pdf,rst.txt
    #[arg(short = 'e', long, value_name = "EXT", num_args = 1.., value_delimiter = ',')]
    exclude_filetypes: Vec<String>,

    /// Write every page as a section of one Markdown file
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write one Markdown file per page into this directory
    #[arg(short = 'd', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Cookie file (JSON export or Netscape cookies.txt)
    #[arg(short = 'c', long, value_name = "FILE")]
    cookies_file: Option<PathBuf>,

    /// Language pages must be written in (ISO 639-1 or 639-3 code)
    #[arg(long, default_value = "en", value_name = "CODE")]
    language: String,

    /// Also follow links to subdomains of the allowed domains
    #[arg(long)]
    include_subdomains: bool,

    /// Maximum number of pages in flight
    #[arg(long, default_value = "8", value_name = "NUM")]
    concurrency: usize,

    /// Stop after this many pages
    #[arg(long, value_name = "NUM")]
    max_pages: Option<usize>,

    /// Append sections as pages finish instead of in discovery order
    #[arg(long)]
    unordered: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Strip images from output
    #[arg(long)]
    no_images: bool,

    /// Save the crawl report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn output_target(&self) -> anyhow::Result<OutputTarget> {
        match (&self.output, &self.output_dir) {
            (Some(file), None) => Ok(OutputTarget::File(file.clone())),
            (None, Some(dir)) => Ok(OutputTarget::Directory(dir.clone())),
            _ => anyhow::bail!("exactly one of --output or --output-dir is required"),
        }
    }

    fn crawl_config(&self) -> anyhow::Result<CrawlConfig> {
        let mut fetch = FetchConfig { timeout: self.timeout, ..Default::default() };
        if let Some(user_agent) = &self.user_agent {
            fetch.user_agent = user_agent.clone();
        }

        CrawlConfig::builder()
            .start_url(self.start_url.as_str())
            .allowed_domains(&self.allowed_domains)
            .include_subdomains(self.include_subdomains)
            .exclude_filetypes(&self.exclude_filetypes)
            .output(self.output_target()?)
            .cookies_file(self.cookies_file.clone())
            .target_language(self.language.as_str())
            .concurrency(self.concurrency)
            .max_pages(self.max_pages)
            .append_order(if self.unordered { AppendOrder::Completion } else { AppendOrder::Discovery })
            .fetch(fetch)
            .markdown(MarkdownConfig { strip_images: self.no_images })
            .build()
            .context("Invalid crawl configuration")
    }
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "sitemd=debug,sitemd_core=debug" } else { "sitemd=info,sitemd_core=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        echo::print_banner();
    }

    let config = args.crawl_config()?;
    if args.verbose {
        echo::print_step(1, 2, "Configuration");
        echo::print_config(&config);
    }

    let fetcher = HttpFetcher::for_crawl(&config).context("Failed to set up HTTP client")?;

    tracing::debug!(start_url = %config.start_url, concurrency = config.concurrency, "Starting crawl");
    let controller = CrawlController::new(config, fetcher);
    let handle = controller.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            echo::print_warning("Interrupted, finishing pages in flight");
            handle.shutdown();
        }
    });

    if args.verbose {
        echo::print_step(2, 2, "Crawling");
    }
    let report = controller.run().await.context("Crawl failed")?;
    echo::print_summary(&report);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Saved crawl report");
        echo::print_report_saved(path);
    }

    if report.interrupted {
        echo::print_warning("Crawl stopped before the frontier was exhausted");
    } else {
        echo::print_success(&format!("Crawl finished, {} pages written", report.pages_written));
    }

    Ok(())
}
