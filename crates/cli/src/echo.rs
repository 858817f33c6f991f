use std::path::Path;

use owo_colors::OwoColorize;
use sitemd_core::{CrawlConfig, CrawlReport, OutputTarget};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "sitemd".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Crawl documentation sites into Markdown\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print the effective crawl settings
pub fn print_config(config: &CrawlConfig) {
    let domains: Vec<&str> = config.allowed_domains.iter().map(String::as_str).collect();
    eprintln!("  {} {}", "Start:".dimmed(), config.start_url.as_str().bright_white().underline());
    eprintln!("  {} {}", "Domains:".dimmed(), domains.join(", ").bright_white());
    if !config.excluded_filetypes.is_empty() {
        eprintln!("  {} {}", "Excluded:".dimmed(), config.excluded_filetypes.join(", ").bright_white());
    }
    let output = match &config.output {
        OutputTarget::Directory(dir) => format!("{} (one file per page)", dir.display()),
        OutputTarget::File(path) => format!("{} (single document)", path.display()),
    };
    eprintln!("  {} {}", "Output:".dimmed(), output.bright_white());
    eprintln!("  {} {}", "Language:".dimmed(), config.target_language.code().bright_white());
    eprintln!("  {} {}\n", "Concurrency:".dimmed(), config.concurrency.to_string().bright_white());
}

/// Print the crawl summary
pub fn print_summary(report: &CrawlReport) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Crawl Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    let rows = [
        ("Fetched", report.pages_fetched),
        ("Written", report.pages_written),
        ("Not HTML", report.skipped_non_html),
        ("Extraction failed", report.extraction_failures),
        ("Wrong language", report.language_rejections),
        ("Redirects", report.redirects_followed),
        ("Redirect skipped", report.redirects_skipped),
        ("Fetch failed", report.fetch_failures),
        ("Write failed", report.write_failures),
        ("Links enqueued", report.links_enqueued),
    ];
    for (label, value) in rows {
        let value = if value == 0 { value.to_string().dimmed().to_string() } else { value.to_string().bright_white().to_string() };
        eprintln!("  {} {}", format!("{:<18}", format!("{label}:")).dimmed(), value);
    }
    eprintln!(
        "  {} {}\n",
        format!("{:<18}", "Duration:").dimmed(),
        format_duration(report.duration_ms).bright_white()
    );
}

/// Print where the report was saved
pub fn print_report_saved(path: &Path) {
    print_success(&format!("Report written to {}", path.display().bright_white()));
}

/// Format a millisecond duration for display
pub fn format_duration(ms: u64) -> String {
    if ms >= 60_000 {
        format!("{}m {:02}s", ms / 60_000, (ms % 60_000) / 1000)
    } else if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{} ms", ms)
    }
}
