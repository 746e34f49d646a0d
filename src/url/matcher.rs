use crate::url::extract_domain;
use url::Url;

/// Checks if a host matches an allow-list pattern
///
/// Two pattern forms are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" and any subdomain of it
///
/// Both arguments are expected to be lowercase.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "www.example.com"));
/// assert!(matches_wildcard("*.example.com", "www.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => match candidate.strip_suffix(base) {
            Some("") => true,
            Some(prefix) => prefix.ends_with('.'),
            None => false,
        },
        None => candidate == pattern,
    }
}

/// The set of hosts a crawl may fetch from
///
/// An empty set places no restriction on hosts. Checks are pure, so a shared
/// reference can be consulted from any number of tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedDomains {
    patterns: Vec<String>,
}

impl AllowedDomains {
    /// Builds an allow-list from host patterns, lowercasing each one
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns true when no restriction is configured
    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the configured patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Checks whether a host may be fetched
    pub fn allows_host(&self, host: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let host = host.to_lowercase();
        self.patterns.iter().any(|p| matches_wildcard(p, &host))
    }

    /// Checks whether a URL's host may be fetched; URLs without a host never are
    pub fn allows(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(host) => self.allows_host(&host),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("bbc.co.uk", "bbc.co.uk"));
        assert!(!matches_wildcard("bbc.co.uk", "www.bbc.co.uk"));
        assert!(!matches_wildcard("www.bbc.co.uk", "bbc.co.uk"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "blog.example.com"));
        assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
    }

    #[test]
    fn test_wildcard_no_match_partial() {
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
        assert!(!matches_wildcard("*.example.com", ""));
    }

    #[test]
    fn test_allowed_domains_exact_set() {
        let allowed = AllowedDomains::new(["www.bbc.co.uk", "bbc.co.uk"]);

        assert!(allowed.allows_host("www.bbc.co.uk"));
        assert!(allowed.allows_host("bbc.co.uk"));
        assert!(allowed.allows_host("BBC.co.uk"));
        assert!(!allowed.allows_host("news.bbc.co.uk"));
        assert!(!allowed.allows_host("other.com"));
    }

    #[test]
    fn test_allowed_domains_url() {
        let allowed = AllowedDomains::new(["example.com"]);

        let inside = Url::parse("https://example.com/a").unwrap();
        let outside = Url::parse("https://other.com/a").unwrap();
        let hostless = Url::parse("data:text/plain,x").unwrap();

        assert!(allowed.allows(&inside));
        assert!(!allowed.allows(&outside));
        assert!(!allowed.allows(&hostless));
    }

    #[test]
    fn test_empty_allow_list_is_unrestricted() {
        let allowed = AllowedDomains::new(Vec::<String>::new());

        assert!(allowed.is_unrestricted());
        assert!(allowed.allows_host("anything.example"));
    }

    #[test]
    fn test_patterns_are_lowercased() {
        let allowed = AllowedDomains::new(["  *.Example.COM "]);

        assert_eq!(allowed.patterns(), &["*.example.com".to_string()]);
        assert!(allowed.allows_host("www.example.com"));
    }
}
