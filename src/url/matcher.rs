/// Checks if a host matches a domain allow-list entry
///
/// Two kinds of entry are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and every
///    subdomain at any depth ("sede.example.com", "a.b.example.com")
///
/// Both arguments are expected in lowercase.
///
/// # Examples
///
/// ```
/// use scopecrawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "sede.example.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "sede.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .map_or(false, |prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
