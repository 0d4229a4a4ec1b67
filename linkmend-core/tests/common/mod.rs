// Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use linkmend_core::{DocumentRef, DocumentRepository, FilePatch, RepoError};
use linkmend_scanner::error::{Result as ScanResult, ScanError};
use linkmend_scanner::{ProbeOutcome, SiteClient};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const SITE: &str = "https://docs.example.com";

pub fn sitemap(urls: &[&str]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
    );
    for url in urls {
        xml.push_str(&format!("<url><loc>{}</loc></url>", url));
    }
    xml.push_str("</urlset>");
    xml
}

/// Site with an optional manifest and scripted probe answers. Unscripted
/// probes answer 404.
#[derive(Default)]
pub struct FakeSite {
    manifest: Option<String>,
    answers: HashMap<String, ProbeOutcome>,
    probes: AtomicUsize,
    probed: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn with_sitemap(urls: &[&str]) -> Self {
        Self {
            manifest: Some(sitemap(urls)),
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn answer(mut self, url: &str, outcome: ProbeOutcome) -> Self {
        self.answers.insert(url.to_string(), outcome);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SiteClient for FakeSite {
    async fn fetch_manifest(&self, url: &str) -> ScanResult<String> {
        self.manifest.clone().ok_or(ScanError::Status {
            url: url.to_string(),
            status: 503,
        })
    }

    async fn probe(&self, url: &str, _timeout: Duration) -> ProbeOutcome {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.probed.lock().unwrap().push(url.to_string());
        self.answers
            .get(url)
            .cloned()
            .unwrap_or(ProbeOutcome::Status { status: 404 })
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub branch: String,
    pub title: String,
    pub description: String,
    pub patches: Vec<FilePatch>,
}

/// Repository held in memory, in listing order.
pub struct MemoryRepository {
    branch: String,
    documents: Vec<(String, String)>,
    unreadable: HashSet<String>,
    reads: Mutex<HashMap<String, usize>>,
    submissions: Mutex<Vec<Submission>>,
}

impl MemoryRepository {
    pub fn new(documents: &[(&str, &str)]) -> Self {
        Self {
            branch: "main".to_string(),
            documents: documents
                .iter()
                .map(|(path, body)| (path.to_string(), body.to_string()))
                .collect(),
            unreadable: HashSet::new(),
            reads: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn unreadable(mut self, path: &str) -> Self {
        self.unreadable.insert(path.to_string());
        self
    }

    pub fn reads_of(&self, path: &str) -> usize {
        self.reads.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    fn describe(&self) -> String {
        "acme/docs".to_string()
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    async fn list_documents(
        &self,
        path_filter: Option<&str>,
    ) -> Result<Vec<DocumentRef>, RepoError> {
        let documents: Vec<DocumentRef> = self
            .documents
            .iter()
            .filter(|(path, _)| match path_filter {
                Some(filter) => {
                    let filter = filter.trim_matches('/');
                    path == filter || path.starts_with(&format!("{}/", filter))
                }
                None => true,
            })
            .map(|(path, _)| DocumentRef::new(path.as_str(), format!("sha-{}", path)))
            .collect();

        if documents.is_empty()
            && let Some(filter) = path_filter
        {
            return Err(RepoError::PathNotFound {
                path: filter.to_string(),
                branch: self.branch.clone(),
            });
        }
        Ok(documents)
    }

    async fn read_document(&self, path: &str) -> Result<String, RepoError> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert(0) += 1;

        if self.unreadable.contains(path) {
            return Err(RepoError::Api {
                status: 500,
                message: "boom".to_string(),
            });
        }
        self.documents
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .ok_or_else(|| RepoError::NotFound {
                path: path.to_string(),
            })
    }

    async fn write_documents(
        &self,
        branch_name: &str,
        title: &str,
        description: &str,
        patches: &[FilePatch],
    ) -> Result<String, RepoError> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(Submission {
            branch: branch_name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            patches: patches.to_vec(),
        });
        Ok(format!("https://github.com/acme/docs/pull/{}", submissions.len()))
    }
}
