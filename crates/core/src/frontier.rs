//! URL frontier: a FIFO queue of pending URLs guarded by a visited set.
//!
//! Every URL is enqueued at most once per crawl. The check-and-insert on the
//! visited set is a single `DashSet::insert`, so concurrent discoveries of
//! the same URL race to exactly one winner.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashSet;
use url::Url;

use crate::classify::normalize_url;

/// A URL taken off the frontier, tagged with its position in crawl order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// Zero-based dequeue position. Contiguous across one run.
    pub seq: usize,
    /// The URL to fetch.
    pub url: Url,
}

/// Outcome of offering a URL to the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The URL was new and is now queued.
    Enqueued,
    /// The URL was already queued or visited.
    Duplicate,
    /// The frontier is shutting down and no longer accepts work.
    ShuttingDown,
}

/// Pending URLs plus the set of every URL ever enqueued.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<VecDeque<Url>>,
    seen: DashSet<String>,
    dequeued: AtomicUsize,
    shutdown: AtomicBool,
}

impl Frontier {
    /// Constructs a new, empty frontier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a URL; it is queued only if it was never seen before.
    pub fn push(&self, url: Url) -> PushOutcome {
        if self.is_shutdown() {
            return PushOutcome::ShuttingDown;
        }

        let mut url = url;
        url.set_fragment(None);
        if !self.seen.insert(normalize_url(&url)) {
            return PushOutcome::Duplicate;
        }

        self.lock_queue().push_back(url);
        PushOutcome::Enqueued
    }

    /// Marks `url` as visited without queueing it.
    ///
    /// Returns `false` when the URL was already seen, e.g. a redirect target
    /// that is also linked directly.
    pub fn claim(&self, url: &Url) -> bool {
        self.seen.insert(normalize_url(url))
    }

    /// Takes the oldest pending URL, or `None` when empty or shut down.
    pub fn pop(&self) -> Option<QueuedUrl> {
        if self.is_shutdown() {
            return None;
        }
        let mut queue = self.lock_queue();
        let url = queue.pop_front()?;
        // Sequence numbers are assigned under the queue lock so they match
        // dequeue order exactly.
        let seq = self.dequeued.fetch_add(1, Ordering::AcqRel);
        Some(QueuedUrl { seq, url })
    }

    /// Number of URLs waiting to be fetched.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Number of distinct URLs ever enqueued.
    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    /// Number of URLs handed out by [`pop`](Self::pop).
    pub fn dequeued(&self) -> usize {
        self.dequeued.load(Ordering::Acquire)
    }

    /// Whether `url` was ever enqueued.
    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(&normalize_url(url))
    }

    /// Stops handing out and accepting URLs. In-flight work is unaffected.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Whether [`shutdown`](Self::shutdown) was requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Url>> {
        self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fifo_order_and_sequence() {
        let frontier = Frontier::new();
        for path in ["a", "b", "c"] {
            assert_eq!(frontier.push(url(&format!("https://example.test/{path}"))), PushOutcome::Enqueued);
        }

        let popped: Vec<QueuedUrl> = std::iter::from_fn(|| frontier.pop()).collect();
        let paths: Vec<&str> = popped.iter().map(|q| q.url.path()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
        assert_eq!(popped.iter().map(|q| q.seq).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(frontier.dequeued(), 3);
    }

    #[test]
    fn test_duplicates_rejected_even_after_visit() {
        let frontier = Frontier::new();
        assert_eq!(frontier.push(url("https://example.test/page")), PushOutcome::Enqueued);
        assert_eq!(frontier.push(url("https://example.test/page#section")), PushOutcome::Duplicate);
        assert!(frontier.pop().is_some());
        assert_eq!(frontier.push(url("https://example.test/page")), PushOutcome::Duplicate);
        assert!(frontier.pop().is_none());
        assert_eq!(frontier.seen(), 1);
    }

    #[test]
    fn test_claim_marks_seen_without_queueing() {
        let frontier = Frontier::new();
        assert!(frontier.claim(&url("https://example.test/new#intro")));
        assert!(!frontier.claim(&url("https://example.test/new")));
        assert_eq!(frontier.push(url("https://example.test/new")), PushOutcome::Duplicate);
        assert_eq!(frontier.pending(), 0);

        frontier.push(url("https://example.test/linked"));
        assert!(!frontier.claim(&url("https://example.test/linked")));
    }

    #[test]
    fn test_shutdown_stops_pop_and_push() {
        let frontier = Frontier::new();
        frontier.push(url("https://example.test/a"));
        frontier.shutdown();
        assert!(frontier.is_shutdown());
        assert!(frontier.pop().is_none());
        assert_eq!(frontier.push(url("https://example.test/b")), PushOutcome::ShuttingDown);
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_concurrent_discovery_enqueues_once() {
        let frontier = Arc::new(Frontier::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|i| {
                            frontier.push(url(&format!("https://example.test/{i}"))) == PushOutcome::Enqueued
                        })
                        .count()
                })
            })
            .collect();

        let enqueued: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(enqueued, 50);
        assert_eq!(frontier.pending(), 50);
    }
}
