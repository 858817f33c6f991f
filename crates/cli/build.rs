use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("sitemd")
        .version(env!("CARGO_PKG_VERSION"))
        .author("sitemd Contributors")
        .about("Crawl a documentation site into Markdown")
        .arg(clap::arg!(-u --"start-url" <URL> "URL the crawl starts from").required(true))
        .arg(
            clap::arg!(-a --"allowed-domains" <DOMAIN> "Domains links may point to")
                .num_args(1..)
                .value_delimiter(','),
        )
        .arg(
            clap::arg!(-e --"exclude-filetypes" <EXT> "File suffixes that are never fetched")
                .num_args(1..)
                .value_delimiter(','),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Write every page as a section of one Markdown file")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-d --"output-dir" <DIR> "Write one Markdown file per page into this directory")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-c --"cookies-file" <FILE> "Cookie file (JSON export or Netscape cookies.txt)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--language <CODE> "Language pages must be written in").default_value("en"))
        .arg(clap::arg!(--"include-subdomains" "Also follow links to subdomains of the allowed domains"))
        .arg(clap::arg!(--concurrency <NUM> "Maximum number of pages in flight").default_value("8"))
        .arg(clap::arg!(--"max-pages" <NUM> "Stop after this many pages"))
        .arg(clap::arg!(--unordered "Append sections as pages finish instead of in discovery order"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests"))
        .arg(clap::arg!(--"no-images" "Strip images from output"))
        .arg(
            clap::arg!(--report <FILE> "Save the crawl report as JSON")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"))
        .group(clap::ArgGroup::new("target").required(true).args(["output", "output-dir"]));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "sitemd", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "sitemd", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "sitemd", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "sitemd", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
