//! Crawl statistics
//!
//! Counters are shared by the Frontier and every worker while the run is in
//! progress, then frozen into a [`CrawlSummary`] at the end.

use crate::config::CrawlMode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Kinds of task outcome counted during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Page written (page crawl) or page visited (asset harvest)
    Persisted,
    /// Fetch or storage failure
    Failed,
    /// Dropped by the Scope Filter
    Rejected,
    /// Dropped by the depth budget
    DepthExceeded,
    /// Lost the Dedup Index claim
    Duplicate,
    /// Asset job handed to the download queue
    AssetQueued,
    /// Still queued when the run was cancelled
    Abandoned,
}

/// Live counters for one crawl run
#[derive(Debug, Default)]
pub struct CrawlStats {
    persisted: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    depth_exceeded: AtomicU64,
    duplicates: AtomicU64,
    assets_queued: AtomicU64,
    abandoned: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub persisted: u64,
    pub failed: u64,
    pub rejected: u64,
    pub depth_exceeded: u64,
    pub duplicates: u64,
    pub assets_queued: u64,
    pub abandoned: u64,
}

impl CrawlStats {
    pub fn record(&self, counter: Counter) {
        let cell = match counter {
            Counter::Persisted => &self.persisted,
            Counter::Failed => &self.failed,
            Counter::Rejected => &self.rejected,
            Counter::DepthExceeded => &self.depth_exceeded,
            Counter::Duplicate => &self.duplicates,
            Counter::AssetQueued => &self.assets_queued,
            Counter::Abandoned => &self.abandoned,
        };
        cell.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            persisted: self.persisted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            depth_exceeded: self.depth_exceeded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            assets_queued: self.assets_queued.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Final status of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub mode: CrawlMode,
    pub counts: StatsSnapshot,

    /// Documents found under the output root by extension glob
    pub documents_on_disk: usize,

    /// True when the run stopped on an external signal
    pub cancelled: bool,

    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Tasks that reached a terminal state
    pub fn total_terminal(&self) -> u64 {
        self.counts.persisted + self.counts.failed
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let terminal = self.total_terminal();
        if terminal == 0 {
            return 0.0;
        }
        (self.counts.persisted as f64 / terminal as f64) * 100.0
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ({} mode) ===\n", summary.mode);

    if summary.cancelled {
        println!("Run was cancelled before the frontier was exhausted.\n");
    }

    let counts = &summary.counts;
    match summary.mode {
        CrawlMode::Page => println!("  Pages persisted:   {}", counts.persisted),
        CrawlMode::Asset => {
            println!("  Pages visited:     {}", counts.persisted);
            println!("  Assets queued:     {}", counts.assets_queued);
        }
    }
    println!("  Failed:            {}", counts.failed);
    println!("  Rejected (scope):  {}", counts.rejected);
    println!("  Depth exceeded:    {}", counts.depth_exceeded);
    println!("  Duplicates:        {}", counts.duplicates);
    if counts.abandoned > 0 {
        println!("  Abandoned:         {}", counts.abandoned);
    }
    if summary.mode == CrawlMode::Page {
        println!("  Documents on disk: {}", summary.documents_on_disk);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} tasks) in {:.1}s",
        summary.success_rate(),
        counts.persisted,
        summary.total_terminal(),
        summary.elapsed.as_secs_f64()
    );
}
