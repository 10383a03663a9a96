//! Link Extractor
//!
//! This module handles parsing rendered HTML to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Download links, flagged for the Asset Harvester

use crate::url::ScopeFilter;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// One hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Absolute http(s) URL
    pub url: Url,

    /// The anchor carried a `download` attribute
    pub download: bool,
}

/// Links of one page, in document order, without repeats
///
/// Iterating is lazy and can be restarted any number of times; the HTML is
/// parsed once up front.
#[derive(Debug, Clone, Default)]
pub struct ExtractedLinks {
    links: Vec<Link>,
}

impl ExtractedLinks {
    pub fn iter(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter()
    }

    /// Navigation links admitted by the scope filter
    ///
    /// Download links are left to the Asset Harvester.
    pub fn in_scope<'a>(&'a self, scope: &'a ScopeFilter) -> impl Iterator<Item = &'a Url> + 'a {
        self.links
            .iter()
            .filter(|link| !link.download && scope.admits(&link.url))
            .map(|link| &link.url)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Parses rendered HTML and extracts the links it carries
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
/// - `<a href="..." download>`, flagged as a download
///
/// **Exclude:**
/// - `<link rel="stylesheet" ...>`, `<script src="...">`, `<img src="...">`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// Relative links resolve against `<base href>` when the page declares one,
/// otherwise against `page_url`.
///
/// # Example
///
/// ```no_run
/// use scopecrawl::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &page_url);
/// assert_eq!(links.len(), 1);
/// ```
pub fn extract_links(html: &str, page_url: &Url) -> ExtractedLinks {
    let document = Html::parse_document(html);
    let base_url = extract_base(&document, page_url);
    collect_links(&document, &base_url)
}

/// Resolves the document's `<base href>`, falling back to the page URL
fn extract_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

fn collect_links(document: &Html, base_url: &Url) -> ExtractedLinks {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let mut push = |href: &str, download: bool| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.as_str().to_string()) {
                links.push(Link { url, download });
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href, element.value().attr("download").is_some());
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href, false);
            }
        }
    }

    ExtractedLinks { links }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
