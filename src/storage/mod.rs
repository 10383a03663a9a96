//! Storage module for persisting crawled pages
//!
//! This module handles:
//! - Mapping URLs to deterministic file paths (flat or hierarchical)
//! - Atomic page and snapshot writes
//! - Enumerating persisted documents for downstream consumers

mod documents;
mod resolver;
mod writer;

pub use documents::enumerate_documents;
pub use resolver::{url_hash, StorageResolver, SNAPSHOT_DIR};
pub use writer::{write_atomic, PageStore};
