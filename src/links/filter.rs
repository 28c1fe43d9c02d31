//! External vs site-local classification.

use crate::error::LinkCheckError;
use url::Url;

const SKIPPED_PREFIXES: &[&str] = &["mailto:", "tel:", "javascript:", "#", "/"];

/// Decides which links leave the site.
#[derive(Debug, Clone)]
pub struct ExternalityFilter {
    site_host: String,
}

impl ExternalityFilter {
    /// Filter for the site published at `site_url`.
    pub fn new(site_url: &str) -> Result<Self, LinkCheckError> {
        let host = Url::parse(site_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| {
                LinkCheckError::InvalidConfig(format!("site URL has no host: {site_url}"))
            })?;
        Ok(Self { site_host: host })
    }

    pub fn site_host(&self) -> &str {
        &self.site_host
    }

    /// `true` only for absolute http(s) URLs with a host other than the site's.
    ///
    /// Relative paths, fragments, `mailto:`/`tel:`/`javascript:` and
    /// malformed URLs are never external.
    pub fn is_external(&self, url: &str) -> bool {
        if url.is_empty() || SKIPPED_PREFIXES.iter().any(|p| url.starts_with(p)) {
            return false;
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return false;
        }
        match Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) if !host.is_empty() => host != self.site_host,
                _ => false,
            },
            Err(_) => false,
        }
    }
}
