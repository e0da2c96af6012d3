use crate::url::extract_domain;
use url::Url;

/// Checks whether a fetched page's final host passes the allowed-host filter
///
/// The filter is a plain substring test against the lowercase host: an
/// `allowed` value of `"example.com"` admits `example.com`, `docs.example.com`
/// and also `notexample.com`. With no filter configured every host passes.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::is_allowed_host;
/// use url::Url;
///
/// let url = Url::parse("https://blog.example.com/post").unwrap();
/// assert!(is_allowed_host(&url, Some("example.com")));
/// assert!(!is_allowed_host(&url, Some("other.com")));
/// assert!(is_allowed_host(&url, None));
/// ```
pub fn is_allowed_host(url: &Url, allowed: Option<&str>) -> bool {
    let Some(allowed) = allowed else {
        return true;
    };

    match extract_domain(url) {
        Some(host) => host.contains(&allowed.to_lowercase()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_no_filter_allows_everything() {
        assert!(is_allowed_host(&url("https://anything.net/"), None));
    }

    #[test]
    fn test_exact_host() {
        assert!(is_allowed_host(&url("https://example.com/"), Some("example.com")));
    }

    #[test]
    fn test_subdomain_contains_fragment() {
        assert!(is_allowed_host(
            &url("https://api.v2.example.com/x"),
            Some("example.com")
        ));
    }

    #[test]
    fn test_substring_semantics() {
        assert!(is_allowed_host(&url("https://notexample.com/"), Some("example.com")));
        assert!(is_allowed_host(&url("https://example.com.evil.io/"), Some("example.com")));
    }

    #[test]
    fn test_other_host_rejected() {
        assert!(!is_allowed_host(&url("https://other.com/"), Some("example.com")));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_allowed_host(&url("https://EXAMPLE.com/"), Some("Example.COM")));
    }

    #[test]
    fn test_port_not_part_of_host() {
        assert!(!is_allowed_host(&url("http://127.0.0.1:8080/"), Some("8080")));
    }
}
