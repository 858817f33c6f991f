//! Output sinks.
//!
//! Converted pages are persisted either as one Markdown file per page
//! ([`PerPageSink`]) or as sections of one aggregate document
//! ([`AggregateSink`]). [`OutputSink`] picks the mode once from the
//! configured [`OutputTarget`].
//!
//! Every URL taken off the frontier must be committed exactly once, with or
//! without a page, so the aggregate sink can release sections in crawl
//! order.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{AppendOrder, OutputTarget};
use crate::pipeline::PageResult;
use crate::{Result, SitemdError};

/// Header line of every aggregate document.
pub const AGGREGATE_HEADER: &str = "# Documentation\n\n";

/// File stem used when a title sanitizes to nothing.
pub const UNTITLED: &str = "untitled";

/// Replaces every character outside the safe set with `_` and trims the
/// ends.
///
/// The safe set is alphanumerics, space, and `._-()`. Only leading and
/// trailing whitespace is ever removed, so the function is idempotent.
///
/// ```rust
/// use sitemd_core::sanitize_filename;
///
/// assert_eq!(sanitize_filename("API: Client/Server (v2)"), "API_ Client_Server (v2)");
/// assert_eq!(sanitize_filename("  Getting Started  "), "Getting Started");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-' | '(' | ')') { c } else { '_' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// What one commit wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkOutcome {
    /// Files or sections written by this commit
    pub written: Vec<PathBuf>,
    /// Per-page writes that failed and were skipped
    pub failed: usize,
}

/// Writes each page to `<sanitized title>.md` inside a directory.
///
/// Titles that sanitize to the same name overwrite each other; the last
/// write wins and the reuse is logged.
#[derive(Debug)]
pub struct PerPageSink {
    dir: PathBuf,
    names: Mutex<HashMap<String, String>>,
}

impl PerPageSink {
    /// Creates the output directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Write`] when the directory cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SitemdError::Write { path: dir.clone(), source })?;
        Ok(Self { dir, names: Mutex::new(HashMap::new()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a title would be written to.
    pub fn path_for(&self, title: &str) -> PathBuf {
        let stem = sanitize_filename(title);
        let stem = if stem.is_empty() { UNTITLED.to_string() } else { stem };
        self.dir.join(format!("{stem}.md"))
    }

    /// Writes `# <title>`, a blank line, then the body.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Write`] when the file cannot be written.
    pub fn write(&self, title: &str, body: &str, source_url: &str) -> Result<PathBuf> {
        let path = self.path_for(title);
        let key = path.to_string_lossy().into_owned();
        {
            let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = names.insert(key, source_url.to_string()) {
                tracing::warn!(
                    path = %path.display(),
                    previous = %previous,
                    url = %source_url,
                    "overwriting page with the same file name"
                );
            }
        }

        fs::write(&path, format!("# {title}\n\n{body}\n")).map_err(|source| SitemdError::Write { path: path.clone(), source })?;
        Ok(path)
    }
}

#[derive(Debug)]
struct AggregateState {
    writer: BufWriter<File>,
    next_seq: usize,
    pending: BTreeMap<usize, Option<PageResult>>,
    failed: bool,
}

/// Appends every page as a `##` section of one document.
///
/// The file is truncated and given its header at creation. Appends are
/// serialized by one lock; with [`AppendOrder::Discovery`] sections are
/// held back until every earlier sequence number has been committed.
#[derive(Debug)]
pub struct AggregateSink {
    path: PathBuf,
    order: AppendOrder,
    state: Mutex<AggregateState>,
}

impl AggregateSink {
    /// Creates (or truncates) the output file and writes the header.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Write`] when the file cannot be created.
    pub fn create(path: impl Into<PathBuf>, order: AppendOrder) -> Result<Self> {
        let path = path.into();
        let write_err = |source| SitemdError::Write { path: path.clone(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut writer = BufWriter::new(File::create(&path).map_err(write_err)?);
        writer.write_all(AGGREGATE_HEADER.as_bytes()).map_err(write_err)?;
        writer.flush().map_err(write_err)?;

        let state = AggregateState { writer, next_seq: 0, pending: BTreeMap::new(), failed: false };
        Ok(Self { path, order, state: Mutex::new(state) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one section immediately, bypassing the reorder buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Write`] when the append fails.
    pub fn append(&self, title: &str, body: &str) -> Result<()> {
        let mut state = self.lock();
        self.write_section(&mut state, title, body)
    }

    /// Commits the result for dequeue position `seq`.
    ///
    /// Returns the number of sections written by this call, which may
    /// include earlier pages that were waiting on `seq`.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Write`] on the first failed append. After
    /// that the sink drops every later commit.
    pub fn commit(&self, seq: usize, page: Option<PageResult>) -> Result<usize> {
        let mut state = self.lock();
        if state.failed {
            return Ok(0);
        }

        if self.order == AppendOrder::Completion {
            return match page {
                Some(page) => self.write_section(&mut state, &page.title, &page.markdown).map(|()| 1),
                None => Ok(0),
            };
        }

        state.pending.insert(seq, page);
        let mut written = 0;
        loop {
            let next = state.next_seq;
            let Some(ready) = state.pending.remove(&next) else {
                break;
            };
            state.next_seq += 1;
            if let Some(page) = ready {
                self.write_section(&mut state, &page.title, &page.markdown)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Number of committed results waiting on an earlier sequence number.
    pub fn buffered(&self) -> usize {
        self.lock().pending.len()
    }

    fn write_section(&self, state: &mut AggregateState, title: &str, body: &str) -> Result<()> {
        let result = write!(state.writer, "## {title}\n\n{body}\n\n").and_then(|()| state.writer.flush());
        result.map_err(|source| {
            state.failed = true;
            state.pending.clear();
            SitemdError::Write { path: self.path.clone(), source }
        })
    }

    fn lock(&self) -> MutexGuard<'_, AggregateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The sink selected for a run.
#[derive(Debug)]
pub enum OutputSink {
    PerPage(PerPageSink),
    Aggregate(AggregateSink),
}

impl OutputSink {
    /// Opens the sink for an output target.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Write`] when the directory or file cannot be
    /// created.
    pub fn open(target: &OutputTarget, order: AppendOrder) -> Result<Self> {
        match target {
            OutputTarget::Directory(dir) => PerPageSink::create(dir).map(Self::PerPage),
            OutputTarget::File(path) => AggregateSink::create(path, order).map(Self::Aggregate),
        }
    }

    /// Commits the outcome of dequeue position `seq`.
    ///
    /// Per-page write failures are logged and counted; only aggregate write
    /// failures are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Write`] when the aggregate file becomes
    /// unwritable.
    pub fn commit(&self, seq: usize, page: Option<PageResult>) -> Result<SinkOutcome> {
        match self {
            Self::PerPage(sink) => {
                let Some(page) = page else {
                    return Ok(SinkOutcome::default());
                };
                match sink.write(&page.title, &page.markdown, page.url.as_str()) {
                    Ok(path) => Ok(SinkOutcome { written: vec![path], failed: 0 }),
                    Err(err) => {
                        tracing::error!(url = %page.url, "{err}");
                        Ok(SinkOutcome { written: Vec::new(), failed: 1 })
                    }
                }
            }
            Self::Aggregate(sink) => {
                let count = sink.commit(seq, page)?;
                Ok(SinkOutcome { written: vec![sink.path().to_path_buf(); count], failed: 0 })
            }
        }
    }
}
