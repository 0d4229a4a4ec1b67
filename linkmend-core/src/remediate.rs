//! Turns scan records into file patches and a draft pull request.

use crate::error::{Error, Result};
use crate::repo::{DocumentRepository, FilePatch};
use crate::scan::BrokenLinkRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub const PULL_REQUEST_TITLE: &str = "chore: fix broken documentation links";
const PULL_REQUEST_INTRO: &str =
    "This PR automatically fixes broken documentation links discovered by linkmend.";

#[derive(Debug, Clone, Default)]
pub struct RemediationOptions {
    /// Records with a lower confidence (0-100) are left alone.
    pub min_confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file_path: String,
    pub broken_url: String,
    pub suggested_url: String,
    pub confidence: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub patches: Vec<FilePatch>,
    pub manifest: Vec<ManifestEntry>,
}

impl RemediationPlan {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestText {
    pub title: String,
    pub body: String,
}

/// Replace every occurrence of `find` with `replace`. Plain text, no pattern
/// syntax.
pub fn replace_literal(body: &str, find: &str, replace: &str) -> String {
    if find.is_empty() {
        return body.to_string();
    }
    body.replace(find, replace)
}

struct PendingFile {
    path: String,
    original: String,
    current: String,
}

/// Fetch each affected document once and apply every suggested replacement
/// to it, in record order.
///
/// Records without a suggestion or below `min_confidence` are skipped, as are
/// repeats of a (file, URL) pair. Only files whose content changed get a
/// patch.
pub async fn build_patches(
    repository: &dyn DocumentRepository,
    records: &[BrokenLinkRecord],
    options: &RemediationOptions,
) -> Result<RemediationPlan> {
    let mut files: Vec<PendingFile> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut applied: HashSet<(&str, &str)> = HashSet::new();
    let mut manifest = Vec::new();

    for record in records {
        let Some(suggested) = record.suggested_url.as_deref() else {
            continue;
        };
        if record.confidence < options.min_confidence {
            debug!(
                "Skipping {} in {}: confidence {}% below {}%",
                record.broken_url, record.file_path, record.confidence, options.min_confidence
            );
            continue;
        }
        if !applied.insert((record.file_path.as_str(), record.broken_url.as_str())) {
            continue;
        }

        let slot = match slots.get(record.file_path.as_str()) {
            Some(&slot) => slot,
            None => {
                let body = repository
                    .read_document(&record.file_path)
                    .await
                    .map_err(|source| Error::DocumentFetch {
                        path: record.file_path.clone(),
                        source,
                    })?;
                files.push(PendingFile {
                    path: record.file_path.clone(),
                    original: body.clone(),
                    current: body,
                });
                slots.insert(record.file_path.as_str(), files.len() - 1);
                files.len() - 1
            }
        };

        let file = &mut files[slot];
        let updated = replace_literal(&file.current, &record.broken_url, suggested);
        if updated == file.current {
            debug!("{}: nothing to replace for {}", file.path, record.broken_url);
            continue;
        }
        file.current = updated;

        manifest.push(ManifestEntry {
            file_path: record.file_path.clone(),
            broken_url: record.broken_url.clone(),
            suggested_url: suggested.to_string(),
            confidence: record.confidence,
        });
    }

    let patches: Vec<FilePatch> = files
        .into_iter()
        .filter(|file| file.current != file.original)
        .map(|file| FilePatch {
            path: file.path,
            content: file.current,
        })
        .collect();

    info!(
        "Planned {} fixes across {} files",
        manifest.len(),
        patches.len()
    );

    Ok(RemediationPlan { patches, manifest })
}

/// Title and checklist body for the pull request.
pub fn describe(plan: &RemediationPlan) -> PullRequestText {
    let mut body = String::from(PULL_REQUEST_INTRO);
    body.push_str("\n\n");
    let lines: Vec<String> = plan
        .manifest
        .iter()
        .map(|entry| {
            format!(
                "- [ ] {}: {} -> {}",
                entry.file_path, entry.broken_url, entry.suggested_url
            )
        })
        .collect();
    body.push_str(&lines.join("\n"));

    PullRequestText {
        title: PULL_REQUEST_TITLE.to_string(),
        body,
    }
}

pub fn default_branch_name(now: DateTime<Utc>) -> String {
    format!("fix-doc-links-{}", now.timestamp_millis())
}

/// Write the plan to `branch_name` and open a draft pull request. Returns
/// the pull request URL.
pub async fn submit(
    repository: &dyn DocumentRepository,
    plan: &RemediationPlan,
    text: &PullRequestText,
    branch_name: &str,
) -> Result<String> {
    if plan.is_empty() {
        return Err(Error::NothingToFix);
    }

    info!(
        "Submitting {} patches to {} on branch {}",
        plan.patches.len(),
        repository.describe(),
        branch_name
    );
    let url = repository
        .write_documents(branch_name, &text.title, &text.body, &plan.patches)
        .await?;
    Ok(url)
}
