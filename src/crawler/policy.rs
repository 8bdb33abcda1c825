use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::error::{CaptureError, Result};

/// Decides which capture targets are acceptable and how they are keyed
#[derive(Debug, Clone)]
pub struct TargetPolicy {
    /// Allowed hosts for capturing (if empty, any host is allowed)
    allowed_hosts: HashSet<String>,
}

impl TargetPolicy {
    /// Create a policy from the configured host allow-list
    pub fn new(allowed_hosts: &[String]) -> Self {
        let allowed_hosts = allowed_hosts
            .iter()
            .map(|host| host.trim().to_lowercase())
            .filter(|host| !host.is_empty())
            .collect();

        Self { allowed_hosts }
    }

    /// Validate a capture target, returning the parsed URL
    pub fn validate(&self, url: &str) -> Result<Url> {
        let parsed_url = Url::parse(url.trim()).map_err(|e| CaptureError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
            return Err(CaptureError::UnsupportedScheme {
                scheme: parsed_url.scheme().to_string(),
            });
        }

        let host = parsed_url
            .host_str()
            .ok_or_else(|| CaptureError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_lowercase();

        if !self.is_host_allowed(&host) {
            debug!("Rejecting URL from non-allowed host: {}", host);
            return Err(CaptureError::HostNotAllowed { host });
        }

        Ok(parsed_url)
    }

    /// Check if a host is allowed, either exactly or as a subdomain
    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }

        let host = host.to_lowercase();
        self.allowed_hosts
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }
}

/// Normalize a URL to avoid duplicates due to minor differences
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();

    // Url already lowercases the host and drops default ports

    // Sort query parameters if present
    if let Some(query) = normalized.query().map(str::to_string) {
        if query.is_empty() {
            normalized.set_query(None);
        } else {
            let mut params: Vec<(String, String)> = query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let mut kv = pair.splitn(2, '=');
                    let k = kv.next().unwrap_or("").to_string();
                    let v = kv.next().unwrap_or("").to_string();
                    (k, v)
                })
                .collect();

            // Sort params by key
            params.sort_by(|a, b| a.0.cmp(&b.0));

            let sorted_query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<String>>()
                .join("&");

            normalized.set_query(Some(&sorted_query));
        }
    }

    // Remove fragments (anchors)
    normalized.set_fragment(None);

    let mut text = normalized.to_string();

    // Remove trailing slash
    if text.ends_with('/') && normalized.path() == "/" && normalized.query().is_none() {
        text.pop();
    }

    text
}

/// Stable, content-independent cache key for a target URL
pub fn cache_key(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First `len` hex characters of the SHA-256 of `input`
pub fn short_hash(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(len);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TargetPolicy {
        TargetPolicy::new(&["example.com".to_string()])
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_validate() {
        let policy = policy();

        // Should accept the allowed host and its subdomains
        assert!(policy.validate("https://example.com/page1").is_ok());
        assert!(policy.validate("http://www.example.com/").is_ok());

        // Should reject other hosts
        assert!(matches!(
            policy.validate("https://other-site.com/page"),
            Err(CaptureError::HostNotAllowed { .. })
        ));

        // Should reject lookalike suffixes
        assert!(policy.validate("https://notexample.com/").is_err());

        // Should reject non-http schemes
        assert!(matches!(
            policy.validate("ftp://example.com/file"),
            Err(CaptureError::UnsupportedScheme { .. })
        ));

        // Should reject garbage
        assert!(matches!(
            policy.validate("not a url"),
            Err(CaptureError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_empty_allow_list_accepts_any_host() {
        let policy = TargetPolicy::new(&[]);
        assert!(policy.validate("https://anything.test/").is_ok());
    }

    #[test]
    fn test_normalize_url() {
        // Test case insensitivity in host
        assert_eq!(
            normalize_url(&url("https://EXAMPLE.com/path")),
            "https://example.com/path"
        );

        // Test removal of default ports
        assert_eq!(
            normalize_url(&url("https://example.com:443/path")),
            "https://example.com/path"
        );

        // Test removal of trailing slash
        assert_eq!(
            normalize_url(&url("https://example.com/")),
            "https://example.com"
        );

        // Test query parameter sorting
        assert_eq!(
            normalize_url(&url("https://example.com/search?b=2&a=1")),
            "https://example.com/search?a=1&b=2"
        );

        // Test fragment removal
        assert_eq!(
            normalize_url(&url("https://example.com/page#section")),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_cache_key_is_stable() {
        let a = cache_key(&url("https://example.com/?b=2&a=1#top"));
        let b = cache_key(&url("https://EXAMPLE.com:443/?a=1&b=2"));

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, cache_key(&url("https://example.com/other")));
    }

    #[test]
    fn test_short_hash() {
        let hash = short_hash("https://example.com/a.png", 8);
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
