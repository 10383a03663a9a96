//! Dedup Index: the set of URLs already claimed in this run
//!
//! Claiming is the single synchronization point that keeps two workers from
//! fetching the same URL. The index lives in memory for one run only.

use crate::url::normalize_url;
use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

/// Append-only set of normalized URLs
#[derive(Debug, Default)]
pub struct DedupIndex {
    visited: Mutex<HashSet<String>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a normalized URL as visited
    ///
    /// Returns true if this call claimed the URL, false if it was already
    /// claimed. Membership test and insert happen under one lock.
    pub fn try_claim(&self, url: &Url) -> bool {
        let mut visited = self.visited.lock().unwrap_or_else(|e| e.into_inner());
        visited.insert(url.as_str().to_string())
    }

    /// Normalizes a raw URL string and claims it
    ///
    /// Unparseable URLs are never claimed.
    pub fn try_claim_str(&self, raw: &str) -> bool {
        match normalize_url(raw) {
            Ok(url) => self.try_claim(&url),
            Err(_) => false,
        }
    }

    pub fn contains(&self, url: &Url) -> bool {
        let visited = self.visited.lock().unwrap_or_else(|e| e.into_inner());
        visited.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.visited.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
