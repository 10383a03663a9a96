//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that drives a crawl run:
//! - Building the Frontier and the crawl strategy for the configured mode
//! - Seeding the Frontier at depth 0
//! - Running `concurrency` workers, each fetching, persisting and offering
//!   follow-up links
//! - Closing the Frontier on cancellation
//! - Producing the final summary

use crate::config::{Config, CrawlMode};
use crate::crawler::frontier::{Admission, Frontier};
use crate::crawler::parser::{extract_links, ExtractedLinks};
use crate::crawler::strategy::{AssetHarvest, CrawlStrategy, PageCrawl};
use crate::output::{AssetSink, Counter, CrawlStats, CrawlSummary, JsonlAssetQueue};
use crate::renderer::{fetch_with_retry, Renderer, RetryPolicy};
use crate::state::{CrawlTask, TaskState};
use crate::storage::{enumerate_documents, PageStore, StorageResolver};
use crate::url::ScopeFilter;
use crate::CrawlError;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Persisted pages between two progress lines
const PROGRESS_EVERY: u64 = 10;

/// Everything a worker shares with its siblings
struct WorkerContext {
    frontier: Arc<Frontier>,
    renderer: Arc<dyn Renderer>,
    strategy: Arc<dyn CrawlStrategy>,
    stats: Arc<CrawlStats>,
    retry: RetryPolicy,
    cancel: CancellationToken,
    started: Instant,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    renderer: Arc<dyn Renderer>,
    asset_sink: Option<Arc<dyn AssetSink>>,
}

impl Coordinator {
    /// Creates a coordinator for a validated configuration
    pub fn new(config: Config, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config,
            renderer,
            asset_sink: None,
        }
    }

    /// Replaces the default JSON Lines asset queue
    pub fn with_asset_sink(mut self, sink: Arc<dyn AssetSink>) -> Self {
        self.asset_sink = Some(sink);
        self
    }

    /// Runs the crawl until the Frontier is exhausted or `cancel` fires
    ///
    /// Cancellation stops the Frontier from handing out or admitting work;
    /// in-flight fetches finish (or time out) before this returns.
    pub async fn run(self, cancel: CancellationToken) -> Result<CrawlSummary, CrawlError> {
        let started = Instant::now();
        let mode = self.config.crawler.mode;
        let stats = Arc::new(CrawlStats::default());

        let (scope, strategy) = self.build_strategy(Arc::clone(&stats)).await?;
        let frontier = Arc::new(Frontier::new(
            scope,
            self.config.active_depth_limit(),
            Arc::clone(&stats),
        ));

        tracing::info!(
            "Starting {} crawl: depth limit {}, {} workers",
            mode,
            describe_depth(frontier.depth_limit()),
            self.config.crawler.concurrency
        );

        for seed in self.config.active_seeds() {
            let url = Url::parse(seed)?;
            match frontier.offer(&url, 0, None) {
                Admission::Queued => tracing::debug!("Seeded {}", url),
                other => tracing::warn!("Seed {} not queued: {:?}", url, other),
            }
        }

        let finished = CancellationToken::new();
        let watcher = {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let abandoned = frontier.close();
                        tracing::info!(
                            "Cancellation requested: {} queued tasks dropped, waiting for {} in flight",
                            abandoned,
                            frontier.in_flight()
                        );
                    }
                    _ = finished.cancelled() => {}
                }
            })
        };

        let ctx = Arc::new(WorkerContext {
            frontier: Arc::clone(&frontier),
            renderer: Arc::clone(&self.renderer),
            strategy: Arc::clone(&strategy),
            stats: Arc::clone(&stats),
            retry: RetryPolicy::from_config(&self.config.renderer),
            cancel: cancel.clone(),
            started,
        });

        let workers: Vec<_> = (0..self.config.crawler.concurrency.max(1))
            .map(|id| tokio::spawn(worker(id, Arc::clone(&ctx))))
            .collect();

        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        finished.cancel();
        let _ = watcher.await;

        strategy.finish().await?;

        let documents_on_disk = match mode {
            CrawlMode::Page => self.count_documents().await,
            CrawlMode::Asset => 0,
        };

        let summary = CrawlSummary {
            mode,
            counts: stats.snapshot(),
            documents_on_disk,
            cancelled: cancel.is_cancelled(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Crawl {}: {} persisted, {} failed, {} assets queued in {:.1}s",
            if summary.cancelled { "cancelled" } else { "completed" },
            summary.counts.persisted,
            summary.counts.failed,
            summary.counts.assets_queued,
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }

    async fn build_strategy(
        &self,
        stats: Arc<CrawlStats>,
    ) -> Result<(ScopeFilter, Arc<dyn CrawlStrategy>), CrawlError> {
        let output = &self.config.output;

        match self.config.crawler.mode {
            CrawlMode::Page => {
                let scope = ScopeFilter::from_config(&self.config.scope)?;
                let store = PageStore::new(StorageResolver::from_config(output));
                tracing::info!(
                    "Persisting pages under {} ({} layout)",
                    output.directory.display(),
                    output.storage_mode
                );
                let strategy =
                    PageCrawl::new(store, scope.clone(), &self.config.assets.extensions, stats);
                Ok((scope, Arc::new(strategy)))
            }
            CrawlMode::Asset => {
                let sink: Arc<dyn AssetSink> = match &self.asset_sink {
                    Some(sink) => Arc::clone(sink),
                    None => Arc::new(
                        JsonlAssetQueue::open(output.directory.join(&self.config.assets.queue_file))
                            .await?,
                    ),
                };
                let scope = ScopeFilter::domain(&self.config.assets.domain);
                let harvest =
                    AssetHarvest::new(&self.config.assets, sink, output.directory.clone(), stats);
                tracing::info!("Harvesting assets on {}", self.config.assets.domain);
                Ok((scope, Arc::new(harvest)))
            }
        }
    }

    async fn count_documents(&self) -> usize {
        let root = self.config.output.directory.clone();
        let extension = self.config.output.extension.clone();

        match tokio::task::spawn_blocking(move || enumerate_documents(&root, &extension)).await {
            Ok(Ok(documents)) => documents.len(),
            Ok(Err(e)) => {
                tracing::warn!("Failed to enumerate persisted documents: {}", e);
                0
            }
            Err(e) => {
                tracing::warn!("Document enumeration task failed: {}", e);
                0
            }
        }
    }
}

async fn worker(id: u32, ctx: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", id);

    while let Some(mut task) = ctx.frontier.next_task().await {
        process_task(&ctx, &mut task).await;
        ctx.frontier.complete();
    }

    tracing::debug!("Worker {} finished", id);
}

/// Drives one claimed task to `Persisted` or `Failed`
async fn process_task(ctx: &WorkerContext, task: &mut CrawlTask) {
    if let Err(e) = task.advance(TaskState::Fetching) {
        tracing::warn!("{}", e);
        ctx.stats.record(Counter::Failed);
        return;
    }

    let page = match fetch_with_retry(ctx.renderer.as_ref(), task, &ctx.retry, &ctx.cancel).await
    {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("{}", e);
            finish_task(ctx, task, TaskState::Failed);
            return;
        }
    };

    let links = if page.is_html() {
        extract_links(&String::from_utf8_lossy(&page.body), &page.final_url)
    } else {
        ExtractedLinks::default()
    };

    let outcome = ctx.strategy.persist(&page, &links).await;

    let next_depth = task.depth + 1;
    let mut queued = 0;
    for url in ctx.strategy.follow(&links) {
        if ctx.frontier.offer(&url, next_depth, Some(&task.url)) == Admission::Queued {
            queued += 1;
        }
    }
    tracing::debug!(
        "{}: {} links, {} queued at depth {}",
        task.url,
        links.len(),
        queued,
        next_depth
    );

    match outcome {
        Ok(()) => finish_task(ctx, task, TaskState::Persisted),
        Err(e) => {
            tracing::warn!("Failed to persist {}: {}", task.url, e);
            finish_task(ctx, task, TaskState::Failed);
        }
    }
}

fn finish_task(ctx: &WorkerContext, task: &mut CrawlTask, state: TaskState) {
    if let Err(e) = task.advance(state) {
        tracing::warn!("{}", e);
    }

    match state {
        TaskState::Persisted => {
            ctx.stats.record(Counter::Persisted);
            let snapshot = ctx.stats.snapshot();
            if snapshot.persisted % PROGRESS_EVERY == 0 {
                let rate = snapshot.persisted as f64 / ctx.started.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages done, {} in frontier, {:.2} pages/sec",
                    snapshot.persisted,
                    ctx.frontier.len(),
                    rate
                );
            }
        }
        _ => ctx.stats.record(Counter::Failed),
    }
}

fn describe_depth(limit: u32) -> String {
    if limit == 0 {
        "unlimited".to_string()
    } else {
        limit.to_string()
    }
}
