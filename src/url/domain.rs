use crate::url::matcher::matches_wildcard;
use url::Url;

/// Extracts the lowercase host of a URL
///
/// Returns `None` for URLs without a host, which never pass normalization.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use scopecrawl::url::extract_domain;
///
/// let url = Url::parse("https://SEDE.Example.org/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sede.example.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a URL's host belongs to a domain pattern
///
/// The pattern follows [`matches_wildcard`]: `example.org` is exact, while
/// `*.example.org` also admits every subdomain.
pub fn in_domain(url: &Url, pattern: &str) -> bool {
    extract_domain(url)
        .map(|domain| matches_wildcard(&pattern.to_lowercase(), &domain))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_ignores_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_in_domain_exact() {
        let url = Url::parse("https://agenciatributaria.gob.es/static_files/x.pdf").unwrap();
        assert!(in_domain(&url, "agenciatributaria.gob.es"));
        assert!(!in_domain(&url, "sede.agenciatributaria.gob.es"));
    }

    #[test]
    fn test_in_domain_wildcard() {
        let url = Url::parse("https://sede.agenciatributaria.gob.es/Sede/inicio.html").unwrap();
        assert!(in_domain(&url, "*.agenciatributaria.gob.es"));
        assert!(!in_domain(&url, "agenciatributaria.gob.es"));
    }

    #[test]
    fn test_in_domain_pattern_case() {
        let url = Url::parse("https://example.org/").unwrap();
        assert!(in_domain(&url, "Example.ORG"));
    }

    #[test]
    fn test_in_domain_rejects_lookalike() {
        let url = Url::parse("https://notexample.org/").unwrap();
        assert!(!in_domain(&url, "*.example.org"));
    }
}
