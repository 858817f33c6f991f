//! Cookie file loading.
//!
//! Two layouts are accepted: a JSON array of cookie objects as exported by
//! browser extensions (`name` or `key`, `value`, `domain`, optional `path`
//! and `secure`), and the tab-separated Netscape `cookies.txt` format.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::{Result, SitemdError};

/// One cookie to seed into the HTTP client's jar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CookieRecord {
    #[serde(alias = "key")]
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
}

fn default_path() -> String {
    "/".to_string()
}

impl CookieRecord {
    /// The origin URL the cookie is registered against.
    pub fn origin(&self) -> Option<Url> {
        let host = self.domain.trim().trim_start_matches('.');
        if host.is_empty() {
            return None;
        }
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{scheme}://{host}/")).ok()
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}; Domain={}; Path={}", self.name, self.value, self.domain, self.path);
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// Reads and parses a cookie file.
///
/// # Errors
///
/// Returns [`SitemdError::CookieFile`] when the file is missing, is
/// malformed JSON, or contains no usable Netscape lines.
pub fn load_cookie_file(path: &Path) -> Result<Vec<CookieRecord>> {
    let content = fs::read_to_string(path)
        .map_err(|e| SitemdError::CookieFile { path: path.to_path_buf(), reason: e.to_string() })?;
    parse_cookies(&content).map_err(|reason| SitemdError::CookieFile { path: path.to_path_buf(), reason })
}

/// Parses cookie file contents, detecting the layout from the first
/// non-blank character.
pub fn parse_cookies(content: &str) -> std::result::Result<Vec<CookieRecord>, String> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let cookies: Vec<CookieRecord> = serde_json::from_str(trimmed).map_err(|e| e.to_string())?;
        return Ok(cookies.into_iter().filter(|c| !c.name.is_empty()).collect());
    }

    let mut cookies = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        // `#HttpOnly_` prefixes a real entry; any other `#` starts a comment.
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            return Err(format!("line {}: expected 7 tab-separated fields, found {}", line_no + 1, fields.len()));
        }
        cookies.push(CookieRecord {
            domain: fields[0].to_string(),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("true"),
            name: fields[5].to_string(),
            value: fields[6].trim_end_matches('\r').to_string(),
        });
    }
    Ok(cookies)
}
