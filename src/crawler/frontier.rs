//! Frontier & Depth Controller
//!
//! This module handles:
//! - Admission of offered URLs (scope, depth budget, dedup claim)
//! - The FIFO queue of claimed tasks shared by all workers
//! - In-flight accounting and natural termination
//! - Closing on cancellation

use crate::crawler::dedup::DedupIndex;
use crate::output::{CrawlStats, Counter};
use crate::state::{CrawlTask, TaskState};
use crate::url::{normalize_url, ScopeFilter};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

/// What happened to an offered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Claimed and queued for fetching
    Queued,
    /// No scope rule matched
    Rejected,
    /// Deeper than the depth budget
    DepthExceeded,
    /// Already claimed earlier in the run
    Duplicate,
    /// Not a crawlable http(s) URL
    Invalid,
    /// The Frontier no longer accepts work
    Closed,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<CrawlTask>,
    in_flight: usize,
    closed: bool,
}

/// The shared work queue
///
/// Offering and completing are the only two touchpoints workers share; both
/// go through the same lock. The crawl ends when the queue is empty and no
/// task is in flight, or when the Frontier is closed.
pub struct Frontier {
    scope: ScopeFilter,

    /// 0 means unlimited
    depth_limit: u32,

    dedup: DedupIndex,
    state: Mutex<FrontierState>,
    notify: Notify,
    stats: Arc<CrawlStats>,
}

impl Frontier {
    pub fn new(scope: ScopeFilter, depth_limit: u32, stats: Arc<CrawlStats>) -> Self {
        Self {
            scope,
            depth_limit,
            dedup: DedupIndex::new(),
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            stats,
        }
    }

    /// Offers a URL for crawling
    ///
    /// The URL is normalized, then checked in order against the Scope
    /// Filter, the depth budget and the Dedup Index. Rejected and too-deep
    /// URLs never touch the Dedup Index.
    pub fn offer(&self, url: &Url, depth: u32, parent: Option<&Url>) -> Admission {
        if self.is_closed() {
            return Admission::Closed;
        }

        let normalized = match normalize_url(url.as_str()) {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("Dropping {}: {}", url, e);
                return Admission::Invalid;
            }
        };

        let mut task = CrawlTask::new(normalized, depth, parent.cloned());

        if !self.scope.admits(&task.url) {
            tracing::debug!("Out of scope: {}", task.url);
            self.stats.record(Counter::Rejected);
            return Admission::Rejected;
        }

        if self.depth_limit > 0 && depth > self.depth_limit {
            tracing::debug!(
                "Depth {} exceeds budget {}: {}",
                depth,
                self.depth_limit,
                task.url
            );
            self.stats.record(Counter::DepthExceeded);
            return Admission::DepthExceeded;
        }

        if task.advance(TaskState::Admitted).is_err() {
            return Admission::Invalid;
        }

        if !self.dedup.try_claim(&task.url) {
            tracing::trace!("Already claimed: {}", task.url);
            self.stats.record(Counter::Duplicate);
            return Admission::Duplicate;
        }

        if task.advance(TaskState::Claimed).is_err() {
            return Admission::Invalid;
        }

        {
            let mut state = self.lock_state();
            if state.closed {
                return Admission::Closed;
            }
            tracing::debug!("Queued (depth {}): {}", task.depth, task.url);
            state.queue.push_back(task);
        }

        self.notify.notify_waiters();
        Admission::Queued
    }

    /// Waits for the next task to fetch
    ///
    /// Returns `None` once the Frontier is exhausted (empty queue, nothing in
    /// flight) or closed. Every task returned must be handed back through
    /// [`Frontier::complete`].
    pub async fn next_task(&self) -> Option<CrawlTask> {
        loop {
            let notified = self.notify.notified();

            {
                let mut state = self.lock_state();

                if state.closed {
                    return None;
                }

                if let Some(task) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }

                if state.in_flight == 0 {
                    tracing::debug!("Frontier exhausted");
                    state.closed = true;
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks a task returned by [`Frontier::next_task`] as finished
    ///
    /// Call only after the task's follow-up links have been offered, so the
    /// Frontier never looks exhausted while work is still being produced.
    pub fn complete(&self) {
        {
            let mut state = self.lock_state();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Stops handing out and admitting work
    ///
    /// In-flight tasks may still complete. Returns the number of queued tasks
    /// that were dropped.
    pub fn close(&self) -> usize {
        let abandoned = {
            let mut state = self.lock_state();
            state.closed = true;
            let abandoned = state.queue.len();
            state.queue.clear();
            abandoned
        };

        for _ in 0..abandoned {
            self.stats.record(Counter::Abandoned);
        }

        self.notify.notify_waiters();
        abandoned
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// Returns the number of queued tasks
    pub fn len(&self) -> usize {
        self.lock_state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.lock_state().in_flight
    }

    pub fn depth_limit(&self) -> u32 {
        self.depth_limit
    }

    pub fn claimed(&self) -> usize {
        self.dedup.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScopeConfig;
    use std::time::Duration;

    fn docs_frontier(depth_limit: u32) -> (Frontier, Arc<CrawlStats>) {
        let scope = ScopeFilter::from_config(&ScopeConfig {
            patterns: vec!["/docs/".to_string()],
            domains: vec![],
        })
        .unwrap();
        let stats = Arc::new(CrawlStats::default());
        (Frontier::new(scope, depth_limit, Arc::clone(&stats)), stats)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_new_frontier() {
        let (frontier, _) = docs_frontier(0);
        assert!(frontier.is_empty());
        assert_eq!(frontier.in_flight(), 0);
        assert!(!frontier.is_closed());
    }

    #[test]
    fn test_offer_in_scope() {
        let (frontier, _) = docs_frontier(0);
        let admission = frontier.offer(&url("https://example.org/docs/a.html"), 0, None);

        assert_eq!(admission, Admission::Queued);
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.claimed(), 1);
    }

    #[test]
    fn test_rejected_url_does_not_touch_dedup() {
        let (frontier, stats) = docs_frontier(0);
        let admission = frontier.offer(&url("https://example.org/other/c.html"), 1, None);

        assert_eq!(admission, Admission::Rejected);
        assert_eq!(frontier.claimed(), 0);
        assert_eq!(stats.snapshot().rejected, 1);
    }

    #[test]
    fn test_depth_budget() {
        let (frontier, stats) = docs_frontier(1);
        let parent = url("https://example.org/docs/b.html");

        assert_eq!(
            frontier.offer(&url("https://example.org/docs/c.html"), 1, Some(&parent)),
            Admission::Queued
        );
        assert_eq!(
            frontier.offer(&url("https://example.org/docs/d/e.html"), 2, Some(&parent)),
            Admission::DepthExceeded
        );
        assert_eq!(frontier.claimed(), 1);
        assert_eq!(stats.snapshot().depth_exceeded, 1);
    }

    #[test]
    fn test_zero_depth_is_unlimited() {
        let (frontier, _) = docs_frontier(0);
        let admission = frontier.offer(&url("https://example.org/docs/deep.html"), 1_000, None);
        assert_eq!(admission, Admission::Queued);
    }

    #[test]
    fn test_duplicate_offers() {
        let (frontier, stats) = docs_frontier(0);

        assert_eq!(
            frontier.offer(&url("https://example.org/docs/a.html"), 0, None),
            Admission::Queued
        );
        assert_eq!(
            frontier.offer(&url("https://EXAMPLE.org/docs/a.html#x"), 1, None),
            Admission::Duplicate
        );
        assert_eq!(frontier.len(), 1);
        assert_eq!(stats.snapshot().duplicates, 1);
    }

    #[tokio::test]
    async fn test_next_task_is_claimed_and_fifo() {
        let (frontier, _) = docs_frontier(0);
        frontier.offer(&url("https://example.org/docs/1.html"), 0, None);
        frontier.offer(&url("https://example.org/docs/2.html"), 0, None);

        let first = frontier.next_task().await.unwrap();
        assert_eq!(first.url.as_str(), "https://example.org/docs/1.html");
        assert_eq!(first.state(), TaskState::Claimed);
        assert_eq!(frontier.in_flight(), 1);

        let second = frontier.next_task().await.unwrap();
        assert_eq!(second.url.as_str(), "https://example.org/docs/2.html");
    }

    #[tokio::test]
    async fn test_empty_frontier_terminates() {
        let (frontier, _) = docs_frontier(0);
        assert!(frontier.next_task().await.is_none());
        assert!(frontier.is_closed());
    }

    #[tokio::test]
    async fn test_waits_for_in_flight_work() {
        let (frontier, _) = docs_frontier(0);
        let frontier = Arc::new(frontier);
        frontier.offer(&url("https://example.org/docs/a.html"), 0, None);

        let task = frontier.next_task().await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.next_task().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        frontier.offer(
            &url("https://example.org/docs/b.html"),
            task.depth + 1,
            Some(&task.url),
        );
        frontier.complete();

        let next = waiter.await.unwrap().unwrap();
        assert_eq!(next.url.as_str(), "https://example.org/docs/b.html");
        assert_eq!(next.depth, 1);
        assert_eq!(next.parent_url.as_ref(), Some(&task.url));

        frontier.complete();
        assert!(frontier.next_task().await.is_none());
    }

    #[tokio::test]
    async fn test_close_drops_queue_and_refuses_offers() {
        let (frontier, stats) = docs_frontier(0);
        frontier.offer(&url("https://example.org/docs/a.html"), 0, None);
        frontier.offer(&url("https://example.org/docs/b.html"), 0, None);

        assert_eq!(frontier.close(), 2);
        assert!(frontier.next_task().await.is_none());
        assert_eq!(
            frontier.offer(&url("https://example.org/docs/c.html"), 0, None),
            Admission::Closed
        );
        assert_eq!(stats.snapshot().abandoned, 2);
    }
}
