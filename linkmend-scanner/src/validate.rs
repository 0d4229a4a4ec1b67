use crate::client::SiteClient;
use crate::result::LinkVerdict;
use crate::sitemap::{SitemapIndex, normalize_url};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(8);

/// Two-tier link check: the sitemap index first, a single live probe second.
#[derive(Clone)]
pub struct LinkValidator {
    client: Arc<dyn SiteClient>,
    timeout: Duration,
}

impl LinkValidator {
    pub fn new(client: Arc<dyn SiteClient>) -> Self {
        Self {
            client,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Network-free half of the check. `Some` when the index settles it.
    pub fn check_indexed(&self, url: &str, index: &SitemapIndex) -> Option<LinkVerdict> {
        index
            .contains(normalize_url(url))
            .then_some(LinkVerdict::Indexed)
    }

    /// Probe `url` once. There are no retries: a failed probe is final for
    /// this scan.
    pub async fn probe(&self, url: &str) -> LinkVerdict {
        let verdict = LinkVerdict::from(self.client.probe(url, self.timeout).await);
        debug!("{} -> {:?}", url, verdict);
        verdict
    }

    pub async fn check(&self, url: &str, index: &SitemapIndex) -> LinkVerdict {
        match self.check_indexed(url, index) {
            Some(verdict) => verdict,
            None => self.probe(url).await,
        }
    }

    pub async fn is_valid(&self, url: &str, index: &SitemapIndex) -> bool {
        self.check(url, index).await.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScanError};
    use crate::result::{BreakReason, ProbeOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers every probe with the same outcome and records what was asked.
    struct ScriptedSite {
        outcome: ProbeOutcome,
        probes: AtomicUsize,
        last_timeout: Mutex<Option<Duration>>,
    }

    impl ScriptedSite {
        fn new(outcome: ProbeOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                probes: AtomicUsize::new(0),
                last_timeout: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl SiteClient for ScriptedSite {
        async fn fetch_manifest(&self, url: &str) -> Result<String> {
            Err(ScanError::Other(format!("no manifest for {}", url)))
        }

        async fn probe(&self, _url: &str, timeout: Duration) -> ProbeOutcome {
            self.probes.fetch_add(1, Ordering::SeqCst);
            *self.last_timeout.lock().unwrap() = Some(timeout);
            self.outcome.clone()
        }
    }

    fn index() -> SitemapIndex {
        SitemapIndex::from_urls(
            "https://docs.example.com",
            ["https://docs.example.com/guides/setup", "https://docs.example.com/api"],
        )
    }

    #[tokio::test]
    async fn test_indexed_url_skips_probe() {
        let site = ScriptedSite::new(ProbeOutcome::Failed("unreachable".into()));
        let validator = LinkValidator::new(site.clone());

        assert!(validator.is_valid("https://docs.example.com/guides/setup", &index()).await);
        assert!(validator.is_valid("https://docs.example.com/guides/setup/", &index()).await);
        assert_eq!(
            validator.check("https://docs.example.com/api", &index()).await,
            LinkVerdict::Indexed
        );
        assert_eq!(site.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unindexed_url_is_probed() {
        let site = ScriptedSite::new(ProbeOutcome::Reachable { status: 200 });
        let validator = LinkValidator::new(site.clone());

        let verdict = validator
            .check("https://docs.example.com/brand-new", &index())
            .await;

        assert_eq!(verdict, LinkVerdict::Reachable { status: 200 });
        assert_eq!(site.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_index_probe_failure_is_broken() {
        let empty = SitemapIndex::empty("https://docs.example.com");

        for (outcome, reason) in [
            (ProbeOutcome::TimedOut, BreakReason::Timeout),
            (ProbeOutcome::Status { status: 404 }, BreakReason::Status(404)),
            (
                ProbeOutcome::Failed("connection reset".into()),
                BreakReason::Network("connection reset".into()),
            ),
        ] {
            let site = ScriptedSite::new(outcome);
            let validator = LinkValidator::new(site.clone());

            assert!(!validator.is_valid("https://docs.example.com/x", &empty).await);
            assert_eq!(
                validator.check("https://docs.example.com/x", &empty).await,
                LinkVerdict::Broken(reason)
            );
            assert_eq!(site.probes.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test]
    async fn test_probe_uses_configured_timeout() {
        let site = ScriptedSite::new(ProbeOutcome::Reachable { status: 204 });
        let validator =
            LinkValidator::new(site.clone()).with_timeout(Duration::from_millis(1500));

        validator
            .check("https://docs.example.com/new", &SitemapIndex::default())
            .await;

        assert_eq!(
            *site.last_timeout.lock().unwrap(),
            Some(Duration::from_millis(1500))
        );
    }
}
