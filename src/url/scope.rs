//! Scope Filter: decides whether a URL is eligible to be fetched
//!
//! A filter is an ordered list of rules fixed at crawl start. A URL is
//! admitted iff at least one rule matches it. The filter holds no state and
//! has no side effects, so it is evaluated before anything touches the
//! Dedup Index.

use crate::config::ScopeConfig;
use crate::url::domain::in_domain;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// One rule of a scope pattern
#[derive(Debug, Clone)]
pub enum ScopeRule {
    /// Regular expression searched anywhere in the URL string
    Pattern(Regex),
    /// Host allow-list entry, exact or `*.`-wildcard
    Domain(String),
}

impl ScopeRule {
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            Self::Pattern(regex) => regex.is_match(url.as_str()),
            Self::Domain(pattern) => in_domain(url, pattern),
        }
    }
}

/// Immutable set of scope rules
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    rules: Vec<ScopeRule>,
}

impl ScopeFilter {
    pub fn new(rules: Vec<ScopeRule>) -> Self {
        Self { rules }
    }

    /// Builds the page-crawl filter from configuration
    ///
    /// Patterns come first, then domains, preserving configuration order.
    pub fn from_config(config: &ScopeConfig) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(config.patterns.len() + config.domains.len());

        for pattern in &config.patterns {
            let regex = Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("Invalid scope pattern '{}': {}", pattern, e))
            })?;
            rules.push(ScopeRule::Pattern(regex));
        }

        for domain in &config.domains {
            rules.push(ScopeRule::Domain(domain.to_lowercase()));
        }

        Ok(Self::new(rules))
    }

    /// A filter admitting exactly one domain, independent of path
    pub fn domain(pattern: &str) -> Self {
        Self::new(vec![ScopeRule::Domain(pattern.to_lowercase())])
    }

    /// Returns true iff at least one rule matches
    pub fn admits(&self, url: &Url) -> bool {
        self.rules.iter().any(|rule| rule.matches(url))
    }

    pub fn rules(&self) -> &[ScopeRule] {
        &self.rules
    }
}
