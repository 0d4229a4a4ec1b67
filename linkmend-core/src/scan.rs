use crate::error::{Error, Result};
use crate::repo::{DocumentRef, DocumentRepository, file_name};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use linkmend_scanner::sitemap::DEFAULT_SITEMAP_PATH;
use linkmend_scanner::suggest::{DEFAULT_LIMIT, DEFAULT_THRESHOLD};
use linkmend_scanner::validate::DEFAULT_PROBE_TIMEOUT;
use linkmend_scanner::{
    BreakReason, LinkExtractor, LinkValidator, LinkVerdict, SiteClient, SitemapCache,
    SitemapIndex, Suggestion, SuggestionEngine,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Callback for reporting scan progress
pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    FetchingSitemap,
    ListingDocuments,
    ScanningDocuments,
    Complete,
}

impl ScanPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ScanPhase::FetchingSitemap => "Fetching sitemap",
            ScanPhase::ListingDocuments => "Listing documents",
            ScanPhase::ScanningDocuments => "Scanning documents",
            ScanPhase::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub current: usize,
    pub total: usize,
    /// Document just finished, during `ScanningDocuments`.
    pub path: Option<String>,
}

fn emit(
    progress: Option<&ProgressCallback>,
    phase: ScanPhase,
    current: usize,
    total: usize,
    path: Option<&str>,
) {
    if let Some(callback) = progress {
        callback(ScanProgress {
            phase,
            current,
            total,
            path: path.map(str::to_string),
        });
    }
}

/// One broken link found in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokenLinkRecord {
    pub file_name: String,
    pub file_path: String,
    pub broken_url: String,
    pub suggested_url: Option<String>,
    /// 0-100, zero when there is no suggestion.
    pub confidence: u8,
    pub reason: BreakReason,
}

impl BrokenLinkRecord {
    pub fn new(
        file_path: &str,
        broken_url: impl Into<String>,
        suggestion: Option<Suggestion>,
        reason: BreakReason,
    ) -> Self {
        let confidence = suggestion.as_ref().map(Suggestion::percent).unwrap_or(0);
        Self {
            file_name: file_name(file_path).to_string(),
            file_path: file_path.to_string(),
            broken_url: broken_url.into(),
            suggested_url: suggestion.map(|s| s.url),
            confidence,
            reason,
        }
    }
}

/// Site-side settings for one scan session.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub base_url: String,
    pub sitemap_path: String,
    pub probe_timeout: Duration,
    pub threshold: f64,
    pub limit: usize,
}

impl ScanSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            sitemap_path: DEFAULT_SITEMAP_PATH.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Everything a scan stage needs, built once per session.
#[derive(Clone)]
pub struct ScanContext {
    pub index: Arc<SitemapIndex>,
    pub extractor: LinkExtractor,
    pub validator: LinkValidator,
    pub engine: SuggestionEngine,
}

impl ScanContext {
    pub fn new(
        index: Arc<SitemapIndex>,
        extractor: LinkExtractor,
        validator: LinkValidator,
        engine: SuggestionEngine,
    ) -> Self {
        Self {
            index,
            extractor,
            validator,
            engine,
        }
    }

    /// Load the sitemap through `cache` (reused if already loaded) and build
    /// the stages from `settings`.
    pub async fn prepare(
        site: Arc<dyn SiteClient>,
        settings: &ScanSettings,
        cache: &SitemapCache,
        progress: Option<&ProgressCallback>,
    ) -> Result<Self> {
        let extractor = LinkExtractor::for_base_url(&settings.base_url)?;

        emit(progress, ScanPhase::FetchingSitemap, 0, 1, None);
        let index = cache
            .get_or_load(site.as_ref(), &settings.base_url, &settings.sitemap_path)
            .await;
        emit(progress, ScanPhase::FetchingSitemap, 1, 1, None);

        let validator = LinkValidator::new(site).with_timeout(settings.probe_timeout);
        let engine = SuggestionEngine::new()
            .with_threshold(settings.threshold)
            .with_limit(settings.limit);

        Ok(Self::new(index, extractor, validator, engine))
    }

    pub fn site(&self) -> &str {
        self.index.base_url()
    }

    /// Validate a single URL against this session's index.
    pub async fn inspect_link(&self, url: &str) -> LinkVerdict {
        self.validator.check(url, &self.index).await
    }

    pub fn suggestions(&self, url: &str) -> Vec<Suggestion> {
        self.engine.suggest_top(url, &self.index)
    }

    /// Verdicts for `links` in input order, probing at most `concurrency`
    /// at a time. Indexed links resolve without a probe.
    pub async fn check_links(&self, links: &[String], concurrency: usize) -> Vec<LinkVerdict> {
        stream::iter(links.iter().map(|url| self.inspect_link(url)))
            .buffered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await
    }
}

pub struct ScanOptions {
    /// Directory or single file to scan; whole repository when `None`.
    pub path_filter: Option<String>,
    /// Probes in flight per document.
    pub concurrency: usize,
    pub progress: Option<ProgressCallback>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            path_filter: None,
            concurrency: 1,
            progress: None,
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub session_id: Uuid,
    pub site: String,
    pub repository: String,
    pub branch: String,
    pub path_filter: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub index_size: usize,
    pub documents_scanned: usize,
    pub links_checked: usize,
    pub records: Vec<BrokenLinkRecord>,
}

impl ScanReport {
    pub fn broken_count(&self) -> usize {
        self.records.len()
    }

    pub fn confirmed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.reason.is_confirmed())
            .count()
    }

    pub fn suggested_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.suggested_url.is_some())
            .count()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Scan every document in `repository` for broken documentation links.
///
/// Documents are processed one at a time in the order the repository lists
/// them, and records come out in document order then link order. A document
/// that cannot be read aborts the scan. Cancellation is checked before each
/// document.
pub async fn scan(
    repository: &dyn DocumentRepository,
    context: &ScanContext,
    options: ScanOptions,
) -> Result<ScanReport> {
    let started_at = Utc::now();
    let progress = options.progress.as_ref();

    info!(
        "Scanning {}@{} against {} ({} indexed pages)",
        repository.describe(),
        repository.branch(),
        context.site(),
        context.index.len()
    );

    emit(progress, ScanPhase::ListingDocuments, 0, 0, None);
    let documents = repository
        .list_documents(options.path_filter.as_deref())
        .await?;
    let total = documents.len();
    emit(progress, ScanPhase::ListingDocuments, total, total, None);

    let mut records = Vec::new();
    let mut links_checked = 0;

    for (completed, document) in documents.iter().enumerate() {
        if let Some(cancel) = &options.cancel
            && cancel.load(Ordering::Relaxed)
        {
            info!("Scan cancelled after {} of {} documents", completed, total);
            return Err(Error::Cancelled { completed, total });
        }

        let found = scan_document(repository, context, document, options.concurrency).await?;
        links_checked += found.0;
        records.extend(found.1);

        emit(
            progress,
            ScanPhase::ScanningDocuments,
            completed + 1,
            total,
            Some(&document.path),
        );
    }

    emit(progress, ScanPhase::Complete, total, total, None);
    info!(
        "Checked {} links in {} documents, {} broken",
        links_checked,
        total,
        records.len()
    );

    Ok(ScanReport {
        session_id: Uuid::new_v4(),
        site: context.site().to_string(),
        repository: repository.describe(),
        branch: repository.branch().to_string(),
        path_filter: options.path_filter,
        started_at,
        finished_at: Utc::now(),
        index_size: context.index.len(),
        documents_scanned: total,
        links_checked,
        records,
    })
}

async fn scan_document(
    repository: &dyn DocumentRepository,
    context: &ScanContext,
    document: &DocumentRef,
    concurrency: usize,
) -> Result<(usize, Vec<BrokenLinkRecord>)> {
    let body = repository
        .read_document(&document.path)
        .await
        .map_err(|source| Error::DocumentFetch {
            path: document.path.clone(),
            source,
        })?;

    let links = context.extractor.extract(&body);
    debug!("{}: {} candidate links", document.path, links.len());

    let verdicts = context.check_links(&links, concurrency).await;
    let records = links
        .iter()
        .zip(verdicts)
        .filter_map(|(url, verdict)| match verdict {
            LinkVerdict::Broken(reason) => {
                let suggestion = context.engine.suggest_best(url, &context.index);
                debug!("{}: broken {} ({})", document.path, url, reason);
                Some(BrokenLinkRecord::new(
                    &document.path,
                    url.as_str(),
                    suggestion,
                    reason,
                ))
            }
            _ => None,
        })
        .collect();

    Ok((links.len(), records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_suggestion() {
        let record = BrokenLinkRecord::new(
            "docs/guides/intro.md",
            "https://docs.example.com/old",
            None,
            BreakReason::Timeout,
        );
        assert_eq!(record.file_name, "intro.md");
        assert_eq!(record.confidence, 0);
        assert!(record.suggested_url.is_none());
    }

    #[test]
    fn test_record_with_suggestion() {
        let record = BrokenLinkRecord::new(
            "intro.md",
            "https://docs.example.com/old",
            Some(Suggestion::new("https://docs.example.com/new".into(), 0.456)),
            BreakReason::Status(404),
        );
        assert_eq!(record.confidence, 46);
        assert_eq!(
            record.suggested_url.as_deref(),
            Some("https://docs.example.com/new")
        );
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(ScanPhase::FetchingSitemap.label(), "Fetching sitemap");
        assert_eq!(ScanPhase::Complete.label(), "Complete");
    }
}
