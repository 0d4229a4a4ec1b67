use crate::error::{Result, ScanError};
use crate::result::ProbeOutcome;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("linkmend/", env!("CARGO_PKG_VERSION"));

/// The documentation site as seen by the engine: one manifest fetch and
/// bounded-time probes of individual pages.
#[async_trait]
pub trait SiteClient: Send + Sync {
    /// Fetch the raw sitemap XML at `url`.
    async fn fetch_manifest(&self, url: &str) -> Result<String>;

    /// Issue a single GET against `url`, giving up after `timeout`.
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// [`SiteClient`] backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpSiteClient {
    client: Client,
}

impl HttpSiteClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    /// `timeout_secs` caps manifest downloads. Probes carry their own timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SiteClient for HttpSiteClient {
    async fn fetch_manifest(&self, url: &str) -> Result<String> {
        debug!("Fetching manifest {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();
        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(url, e),
        };

        let status = response.status();
        if !status.is_success() {
            debug!("Probe {} -> {} in {:?}", url, status, start.elapsed());
            return ProbeOutcome::Status {
                status: status.as_u16(),
            };
        }

        // A success status with an unreadable body still counts as broken.
        match response.text().await {
            Ok(_) => {
                debug!("Probe {} -> {} in {:?}", url, status, start.elapsed());
                ProbeOutcome::Reachable {
                    status: status.as_u16(),
                }
            }
            Err(e) => classify_error(url, e),
        }
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> ProbeOutcome {
    if error.is_timeout() {
        debug!("Probe {} timed out", url);
        ProbeOutcome::TimedOut
    } else {
        debug!("Probe {} failed: {}", url, error);
        ProbeOutcome::Failed(error.to_string())
    }
}
