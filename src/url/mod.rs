//! URL handling module for Scopecrawl
//!
//! This module provides URL normalization, domain extraction, wildcard
//! matching and the Scope Filter.

mod domain;
mod matcher;
mod normalize;
mod scope;

pub use domain::{extract_domain, in_domain};
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;
pub use scope::{ScopeFilter, ScopeRule};
