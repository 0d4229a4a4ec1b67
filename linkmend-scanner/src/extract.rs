use crate::error::{Result, ScanError};
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Finds links to one documentation host in raw document text.
///
/// A link is `<scheme>://<host>/` followed by at least one of letters,
/// digits and `-_./`; any other character ends the match. A bare site root
/// is never a link. The text is not parsed as Markdown.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    pattern: Regex,
    root_len: usize,
}

impl LinkExtractor {
    /// Build an extractor for the scheme and host of `base_url`.
    pub fn for_base_url(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ScanError::InvalidUrl(format!("{} has no host", base_url)))?;

        Self::new(parsed.scheme(), host)
    }

    pub fn new(scheme: &str, host: &str) -> Result<Self> {
        let pattern = format!(
            r"{}://{}/[a-zA-Z0-9\-_./]+",
            regex::escape(scheme),
            regex::escape(host)
        );
        let pattern = Regex::new(&pattern).map_err(|e| ScanError::Other(e.to_string()))?;
        Ok(Self {
            pattern,
            root_len: scheme.len() + "://".len() + host.len() + 1,
        })
    }

    /// Unique links in `text`, in order of first appearance.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for found in self.pattern.find_iter(text) {
            // A full stop ending a sentence is not part of the path.
            let link = found.as_str().trim_end_matches('.');
            if link.len() <= self.root_len {
                continue;
            }
            if seen.insert(link) {
                links.push(link.to_string());
            }
        }

        links
    }
}
