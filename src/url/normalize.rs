use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into the form used as a frontier key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed (the parser already lowercases the
///    host and resolves `.`/`..` path segments)
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Reject URLs without a host
/// 4. Remove the fragment (everything after #)
///
/// Scheme and `www.` prefix are kept as-is: allow-lists name hosts exactly,
/// and a harvester must fetch what it was pointed at.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_url;
///
/// let url = normalize_url("https://WWW.EXAMPLE.COM/a/../page#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL (see [`normalize_url`])
pub fn normalize_parsed(mut url: Url) -> UrlResult<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    url.set_fragment(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keeps_scheme_and_www() {
        let result = normalize_url("http://www.example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://www.example.com/page");
    }

    #[test]
    fn test_lowercase_domain() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_dot_segments_resolved() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_query_preserved() {
        let result = normalize_url("https://example.com/search?q=rust&page=2").unwrap();
        assert_eq!(result.as_str(), "https://example.com/search?q=rust&page=2");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let result = normalize_url("  https://example.com/a \n").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        let result = normalize_url("not a url");
        assert!(matches!(result.unwrap_err(), UrlError::Parse(_)));
    }
}
