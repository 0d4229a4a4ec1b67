//! The authoritative set of documentation URLs, loaded from the site's
//! `sitemap.xml`.
//!
//! Loading never fails: a fetch or parse error yields an empty index and a
//! warning, and callers fall back to live probing. An empty index means "no
//! authoritative data", not "the site has no pages".

use crate::client::SiteClient;
use crate::error::{Result, ScanError};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub const DEFAULT_SITEMAP_PATH: &str = "/sitemap.xml";

/// Strip surrounding whitespace and all trailing slashes so that
/// `https://docs.example.com/page/` and `https://docs.example.com/page`
/// compare equal.
pub fn normalize_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

/// Join a site base URL and a manifest path without doubling slashes.
pub fn manifest_url(base_url: &str, sitemap_path: &str) -> String {
    if sitemap_path.starts_with("http://") || sitemap_path.starts_with("https://") {
        return sitemap_path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        sitemap_path.trim_start_matches('/')
    )
}

/// Immutable, ordered set of normalized page URLs.
#[derive(Debug, Clone, Default)]
pub struct SitemapIndex {
    base_url: String,
    urls: Vec<String>,
    lookup: HashSet<String>,
}

impl SitemapIndex {
    pub fn empty(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            urls: Vec::new(),
            lookup: HashSet::new(),
        }
    }

    /// Build an index from raw `<loc>` values. Entries are normalized,
    /// anything that is not an `http(s)` URL is dropped, and duplicates keep
    /// their first position.
    pub fn from_urls<I, S>(base_url: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::empty(base_url);
        for url in urls {
            let normalized = normalize_url(url.as_ref());
            if !normalized.starts_with("http") {
                continue;
            }
            if index.lookup.insert(normalized.to_string()) {
                index.urls.push(normalized.to_string());
            }
        }
        index
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lookup.contains(normalize_url(url))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URLs in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    /// Fetch and parse the manifest. On any failure the error is logged and
    /// an empty index is returned.
    pub async fn load(client: &dyn SiteClient, base_url: &str, sitemap_path: &str) -> Self {
        let url = manifest_url(base_url, sitemap_path);
        match fetch_locations(client, &url).await {
            Ok(locations) => {
                let index = Self::from_urls(base_url, locations);
                info!("Loaded {} valid URLs from sitemap {}", index.len(), url);
                index
            }
            Err(e) => {
                warn!(
                    "Sitemap {} unavailable, falling back to live probing: {}",
                    url, e
                );
                Self::empty(base_url)
            }
        }
    }
}

/// Locations found in one sitemap document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `<url><loc>` entries of a `<urlset>`.
    pub pages: Vec<String>,
    /// `<sitemap><loc>` entries of a `<sitemapindex>`.
    pub children: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Parent {
    None,
    Url,
    Sitemap,
}

/// Parse a `<urlset>` or `<sitemapindex>` document.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut document = SitemapDocument::default();
    let mut saw_root = false;
    let mut parent = Parent::None;
    let mut in_loc = false;
    let mut loc = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"urlset" | b"sitemapindex" => saw_root = true,
                b"url" => parent = Parent::Url,
                b"sitemap" => parent = Parent::Sitemap,
                b"loc" => {
                    in_loc = true;
                    loc.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_loc => {
                let text = t
                    .unescape()
                    .map_err(|e| ScanError::ParseError(e.to_string()))?;
                loc.push_str(&text);
            }
            Ok(Event::CData(c)) if in_loc => {
                loc.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"loc" => {
                    in_loc = false;
                    let value = loc.trim().to_string();
                    if value.is_empty() {
                        continue;
                    }
                    match parent {
                        Parent::Url => document.pages.push(value),
                        Parent::Sitemap => document.children.push(value),
                        Parent::None => {}
                    }
                }
                b"url" | b"sitemap" => parent = Parent::None,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if matches!(e.local_name().as_ref(), b"urlset" | b"sitemapindex") {
                    saw_root = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScanError::ParseError(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(ScanError::ParseError(
            "document has no <urlset> or <sitemapindex> root".to_string(),
        ));
    }

    Ok(document)
}

/// Fetch a manifest and, when it is a sitemap index, the sitemaps it lists
/// (one level deep). Child failures are logged and skipped.
async fn fetch_locations(client: &dyn SiteClient, url: &str) -> Result<Vec<String>> {
    let body = client.fetch_manifest(url).await?;
    let root = parse_sitemap(&body)?;
    let mut locations = root.pages;

    for child in root.children {
        debug!("Following child sitemap {}", child);
        let parsed = match client.fetch_manifest(&child).await {
            Ok(body) => parse_sitemap(&body),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(document) => {
                if !document.children.is_empty() {
                    debug!(
                        "Ignoring {} nested sitemap indexes under {}",
                        document.children.len(),
                        child
                    );
                }
                locations.extend(document.pages);
            }
            Err(e) => warn!("Skipping child sitemap {}: {}", child, e),
        }
    }

    Ok(locations)
}

/// Per-session cache: the manifest is fetched at most once, later callers get
/// the same `Arc`.
#[derive(Debug, Default)]
pub struct SitemapCache {
    cell: OnceCell<Arc<SitemapIndex>>,
}

impl SitemapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load(
        &self,
        client: &dyn SiteClient,
        base_url: &str,
        sitemap_path: &str,
    ) -> Arc<SitemapIndex> {
        self.cell
            .get_or_init(|| async {
                Arc::new(SitemapIndex::load(client, base_url, sitemap_path).await)
            })
            .await
            .clone()
    }

    pub fn get(&self) -> Option<Arc<SitemapIndex>> {
        self.cell.get().cloned()
    }
}
