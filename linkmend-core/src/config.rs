use crate::error::{Error, Result};
use crate::github::{DEFAULT_API_BASE, DEFAULT_EXTENSIONS};
use crate::remediate::RemediationOptions;
use crate::scan::ScanSettings;
use linkmend_scanner::sitemap::DEFAULT_SITEMAP_PATH;
use linkmend_scanner::suggest::{DEFAULT_LIMIT, DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/linkmend/config.toml";

pub const ENV_SITE: &str = "LINKMEND_SITE";
pub const ENV_REPO: &str = "LINKMEND_REPO";
pub const ENV_BRANCH: &str = "LINKMEND_BRANCH";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";

/// Written by `linkmend init`.
pub const DEFAULT_CONFIG: &str = r#"# linkmend configuration

[site]
# Documentation site whose links are checked.
# base_url = "https://docs.example.com"
sitemap_path = "/sitemap.xml"
probe_timeout_secs = 8

[repository]
# GitHub repository holding the documentation sources. Accepts
# https://github.com/<owner>/<repo>/tree/<branch>/<path> links as well.
# url = "https://github.com/owner/repo"
# branch = "main"
# path = "docs"
extensions = ["md", "mdx"]
api_base = "https://api.github.com"

[scan]
# Live probes in flight per document. 1 checks links one at a time.
concurrency = 1
suggestion_threshold = 0.15
suggestion_limit = 5

[remediation]
# Fixes below this confidence (0-100) are not applied.
min_confidence = 0
# Branch pull requests target. Also the branch scanned when none is given;
# it must match the scanned branch for fixes to be written.
# base_branch = "main"

# The GitHub token is read from GITHUB_TOKEN and never stored here.
"#;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteSection,
    pub repository: RepositorySection,
    pub scan: ScanSection,
    pub remediation: RemediationSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteSection {
    pub base_url: Option<String>,
    pub sitemap_path: String,
    pub probe_timeout_secs: u64,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            base_url: None,
            sitemap_path: DEFAULT_SITEMAP_PATH.to_string(),
            probe_timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySection {
    pub url: Option<String>,
    pub branch: Option<String>,
    pub path: Option<String>,
    pub extensions: Vec<String>,
    pub api_base: String,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            url: None,
            branch: None,
            path: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanSection {
    pub concurrency: usize,
    pub suggestion_threshold: f64,
    pub suggestion_limit: usize,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            concurrency: 1,
            suggestion_threshold: DEFAULT_THRESHOLD,
            suggestion_limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RemediationSection {
    pub min_confidence: u8,
    pub base_branch: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref())
}

/// Load a config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

/// Write [`DEFAULT_CONFIG`] to `path`, creating parent directories. An
/// existing file is only replaced with `force`.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            Error::Config(format!("failed to create {}: {}", parent.display(), e))
        })?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| Error::Config(format!("failed to write {}: {}", path.display(), e)))
}

/// `GITHUB_TOKEN`, if set and non-empty.
pub fn github_token() -> Option<String> {
    env::var(ENV_TOKEN)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl Config {
    /// Apply `LINKMEND_*` overrides fetched through `lookup`. Blank values
    /// are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(site) = get(ENV_SITE) {
            self.site.base_url = Some(site);
        }
        if let Some(repo) = get(ENV_REPO) {
            self.repository.url = Some(repo);
        }
        if let Some(branch) = get(ENV_BRANCH) {
            self.repository.branch = Some(branch);
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.site.base_url {
            let parsed = Url::parse(base_url)
                .map_err(|e| Error::Config(format!("site.base_url '{}': {}", base_url, e)))?;
            if parsed.host_str().is_none() {
                return Err(Error::Config(format!(
                    "site.base_url '{}' has no host",
                    base_url
                )));
            }
        }
        if self.site.probe_timeout_secs == 0 {
            return Err(Error::Config(
                "site.probe_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.scan.concurrency == 0 {
            return Err(Error::Config(
                "scan.concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.scan.suggestion_threshold) {
            return Err(Error::Config(format!(
                "scan.suggestion_threshold must be between 0 and 1, got {}",
                self.scan.suggestion_threshold
            )));
        }
        if self.remediation.min_confidence > 100 {
            return Err(Error::Config(format!(
                "remediation.min_confidence must be between 0 and 100, got {}",
                self.remediation.min_confidence
            )));
        }
        if self.repository.extensions.is_empty() {
            return Err(Error::Config(
                "repository.extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<&str> {
        self.site.base_url.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "no documentation site configured (set [site] base_url or {})",
                ENV_SITE
            ))
        })
    }

    pub fn scan_settings(&self) -> Result<ScanSettings> {
        Ok(ScanSettings {
            base_url: self.base_url()?.trim_end_matches('/').to_string(),
            sitemap_path: self.site.sitemap_path.clone(),
            probe_timeout: Duration::from_secs(self.site.probe_timeout_secs),
            threshold: self.scan.suggestion_threshold,
            limit: self.scan.suggestion_limit,
        })
    }

    pub fn remediation_options(&self) -> RemediationOptions {
        RemediationOptions {
            min_confidence: self.remediation.min_confidence,
        }
    }
}
