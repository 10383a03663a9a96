//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: lifecycle of a crawl task (pending, admitted, claimed, fetching, persisted, failed)
//! - `CrawlTask`: a URL with its depth and parent, carrying its `TaskState`

mod task;
mod task_state;

pub use task::CrawlTask;
pub use task_state::TaskState;
