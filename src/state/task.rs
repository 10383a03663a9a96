use crate::state::TaskState;
use crate::CrawlError;
use url::Url;

/// A unit of crawl work
///
/// Created by the Frontier when a URL is offered, consumed when a worker
/// drives it to `Persisted` or `Failed`.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// Normalized URL to fetch
    pub url: Url,

    /// Link distance from the seeds (seeds are 0)
    pub depth: u32,

    /// Page the link was extracted from; `None` for seeds
    pub parent_url: Option<Url>,

    state: TaskState,
}

impl CrawlTask {
    pub fn new(url: Url, depth: u32, parent_url: Option<Url>) -> Self {
        Self {
            url,
            depth,
            parent_url,
            state: TaskState::Pending,
        }
    }

    pub fn seed(url: Url) -> Self {
        Self::new(url, 0, None)
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Moves the task to its next lifecycle state
    pub fn advance(&mut self, next: TaskState) -> Result<(), CrawlError> {
        if !self.state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
        Ok(())
    }
}
