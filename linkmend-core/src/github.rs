//! [`DocumentRepository`] over the GitHub REST v3 API.
//!
//! Reads go through the contents API on the configured branch. A remediation
//! run resolves the base branch, creates the fix branch from it, updates one
//! file per request and opens a draft pull request.

use crate::repo::{DocumentRef, DocumentRepository, FilePatch, RemediationStep, RepoError};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "mdx"];

/// Repository coordinates parsed from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocator {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub path: Option<String>,
}

impl RepoLocator {
    /// Accepts `owner/repo`, `https://github.com/owner/repo[.git]`, and links
    /// copied from the web UI such as
    /// `https://github.com/owner/repo/tree/<branch>/<path>` or `/blob/...`.
    /// The branch is taken to be a single path segment.
    pub fn parse(input: &str) -> Result<Self, RepoError> {
        let invalid = || RepoError::InvalidLocator(input.to_string());

        let trimmed = input.trim();
        let trimmed = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
        let rest = [
            "https://github.com/",
            "http://github.com/",
            "https://www.github.com/",
            "github.com/",
        ]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);

        if rest.contains("://") {
            return Err(invalid());
        }

        let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() < 2 {
            return Err(invalid());
        }

        let owner = parts[0];
        let repo = parts[1].trim_end_matches(".git");
        if repo.is_empty() {
            return Err(invalid());
        }

        let (branch, path) = match parts.get(2) {
            Some(&"tree") | Some(&"blob") if parts.len() > 3 => (
                Some(parts[3].to_string()),
                (parts.len() > 4).then(|| parts[4..].join("/")),
            ),
            _ => (None, None),
        };

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch,
            path,
        })
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[derive(Deserialize)]
struct ContentEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    sha: String,
}

#[derive(Deserialize)]
struct FileContent {
    path: String,
    sha: String,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Contents {
    Dir(Vec<ContentEntry>),
    File(FileContent),
}

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct PullRequest {
    html_url: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Clone)]
pub struct GitHubRepository {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    token: Option<String>,
    extensions: Vec<String>,
    base_branch: Option<String>,
}

impl GitHubRepository {
    pub fn new(
        locator: &RepoLocator,
        branch: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, RepoError> {
        let client = Client::builder()
            .user_agent(concat!("linkmend/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            owner: locator.owner.clone(),
            repo: locator.repo.clone(),
            branch: branch.into(),
            token,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            base_branch: None,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// File extensions (without the dot) treated as documents.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Expected base for the pull request. Writing is refused unless it
    /// names the branch documents are read from.
    pub fn with_base_branch(mut self, base_branch: Option<String>) -> Self {
        self.base_branch = base_branch;
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// The repository's default branch, as reported by the API.
    pub async fn default_branch(&self) -> Result<String, RepoError> {
        let info: RepoInfo = self
            .send(self.request(Method::GET, self.repo_url(&[])?))
            .await?
            .ok_or_else(|| RepoError::NotFound {
                path: self.describe(),
            })?;
        Ok(info.default_branch)
    }

    fn is_document(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((_, ext)) => self
                .extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, RepoError> {
        let invalid = || RepoError::InvalidLocator(self.api_base.clone());
        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_url(&self, tail: &[&str]) -> Result<Url, RepoError> {
        let mut segments = vec!["repos", self.owner.as_str(), self.repo.as_str()];
        segments.extend_from_slice(tail);
        self.api_url(&segments)
    }

    fn contents_url(&self, path: &str, git_ref: Option<&str>) -> Result<Url, RepoError> {
        let mut tail = vec!["contents"];
        tail.extend(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.repo_url(&tail)?;
        if let Some(git_ref) = git_ref {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github.v3+json");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("token {}", token)),
            None => builder,
        }
    }

    /// Send and decode. A 404 is `Ok(None)`, any other failure status is
    /// [`RepoError::Api`] with GitHub's message.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Option<T>, RepoError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response
                .json::<ApiMessage>()
                .await
                .map(|m| m.message)
                .unwrap_or_else(|_| "no details".to_string());
            return Err(RepoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Some(response.json::<T>().await?))
    }

    async fn get_contents(&self, path: &str, git_ref: &str) -> Result<Option<Contents>, RepoError> {
        let url = self.contents_url(path, Some(git_ref))?;
        self.send(self.request(Method::GET, url)).await
    }

    /// Walks directory listings depth-first, keeping each directory's
    /// entries in place of the directory itself.
    async fn collect(
        &self,
        entries: Vec<ContentEntry>,
        out: &mut Vec<DocumentRef>,
    ) -> Result<(), RepoError> {
        let mut stack = vec![entries.into_iter()];
        while let Some(level) = stack.last_mut() {
            let Some(entry) = level.next() else {
                stack.pop();
                continue;
            };
            match entry.kind.as_str() {
                "dir" => match self.get_contents(&entry.path, &self.branch).await? {
                    Some(Contents::Dir(children)) => stack.push(children.into_iter()),
                    Some(Contents::File(_)) => {}
                    None => return Err(RepoError::NotFound { path: entry.path }),
                },
                "file" if self.is_document(&entry.name) => {
                    out.push(DocumentRef::new(entry.path, entry.sha));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The fix branch is cut from, and the pull request targets, the branch
    /// the documents were read from: patches are whole bodies of those files.
    async fn resolve_base(&self) -> Result<(String, String), RepoError> {
        let base = match &self.base_branch {
            Some(base) if base != &self.branch => {
                return Err(RepoError::BaseMismatch {
                    read: self.branch.clone(),
                    base: base.clone(),
                });
            }
            _ => self.branch.clone(),
        };

        let mut tail = vec!["git", "ref", "heads"];
        tail.extend(base.split('/'));
        let reference: GitRef = self
            .send(self.request(Method::GET, self.repo_url(&tail)?))
            .await?
            .ok_or_else(|| RepoError::NotFound {
                path: format!("heads/{}", base),
            })?;

        Ok((base, reference.object.sha))
    }

    async fn create_branch(&self, branch_name: &str, sha: &str) -> Result<(), RepoError> {
        let body = json!({
            "ref": format!("refs/heads/{}", branch_name),
            "sha": sha,
        });
        self.send::<serde_json::Value>(
            self.request(Method::POST, self.repo_url(&["git", "refs"])?)
                .json(&body),
        )
        .await?
        .ok_or_else(|| RepoError::NotFound {
            path: self.describe(),
        })?;
        Ok(())
    }

    async fn write_file(&self, branch_name: &str, patch: &FilePatch) -> Result<(), RepoError> {
        let existing = match self.get_contents(&patch.path, branch_name).await? {
            Some(Contents::File(file)) => Some(file.sha),
            _ => None,
        };

        let mut body = json!({
            "message": format!("chore: fix documentation link in {}", patch.path),
            "content": STANDARD.encode(patch.content.as_bytes()),
            "branch": branch_name,
        });
        if let Some(sha) = existing {
            body["sha"] = json!(sha);
        }

        self.send::<serde_json::Value>(
            self.request(Method::PUT, self.contents_url(&patch.path, None)?)
                .json(&body),
        )
        .await?
        .ok_or_else(|| RepoError::NotFound {
            path: patch.path.clone(),
        })?;
        Ok(())
    }

    async fn open_pull_request(
        &self,
        branch_name: &str,
        base: &str,
        title: &str,
        description: &str,
    ) -> Result<String, RepoError> {
        let body = json!({
            "title": title,
            "body": description,
            "head": branch_name,
            "base": base,
            "draft": true,
        });
        let pull: PullRequest = self
            .send(
                self.request(Method::POST, self.repo_url(&["pulls"])?)
                    .json(&body),
            )
            .await?
            .ok_or_else(|| RepoError::NotFound {
                path: self.describe(),
            })?;
        Ok(pull.html_url)
    }
}

fn step_error(step: RemediationStep) -> impl FnOnce(RepoError) -> RepoError {
    move |error| RepoError::Step {
        step,
        message: error.to_string(),
    }
}

/// Earlier writes stay on the branch when a later step fails; say so.
fn after_writes(written: usize, branch: &str) -> impl FnOnce(RepoError) -> RepoError + '_ {
    move |error| match error {
        RepoError::Step { step, message } if written > 0 => RepoError::Step {
            step,
            message: format!(
                "{} ({} file(s) already written to '{}')",
                message, written, branch
            ),
        },
        other => other,
    }
}

fn decode_content(file: FileContent) -> Result<String, RepoError> {
    let decode_error = |message: &str| RepoError::Decode {
        path: file.path.clone(),
        message: message.to_string(),
    };

    if file.encoding.as_deref() != Some("base64") {
        return Err(decode_error("content is not base64 encoded (file too large?)"));
    }
    let encoded: String = file
        .content
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| decode_error(&e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| decode_error(&e.to_string()))
}

#[async_trait]
impl DocumentRepository for GitHubRepository {
    fn describe(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    async fn list_documents(
        &self,
        path_filter: Option<&str>,
    ) -> Result<Vec<DocumentRef>, RepoError> {
        let root = path_filter.map(|p| p.trim_matches('/')).unwrap_or("");
        let contents = self
            .get_contents(root, &self.branch)
            .await?
            .ok_or_else(|| RepoError::PathNotFound {
                path: if root.is_empty() { "/" } else { root }.to_string(),
                branch: self.branch.clone(),
            })?;

        let mut documents = Vec::new();
        match contents {
            Contents::File(file) => documents.push(DocumentRef::new(file.path, file.sha)),
            Contents::Dir(entries) => self.collect(entries, &mut documents).await?,
        }

        info!(
            "Found {} documents in {}@{} under '{}'",
            documents.len(),
            self.describe(),
            self.branch,
            root
        );
        Ok(documents)
    }

    async fn read_document(&self, path: &str) -> Result<String, RepoError> {
        debug!("Reading {}@{}", path, self.branch);
        match self.get_contents(path, &self.branch).await? {
            Some(Contents::File(file)) => decode_content(file),
            Some(Contents::Dir(_)) => Err(RepoError::Decode {
                path: path.to_string(),
                message: "path is a directory".to_string(),
            }),
            None => Err(RepoError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    async fn write_documents(
        &self,
        branch_name: &str,
        title: &str,
        description: &str,
        patches: &[FilePatch],
    ) -> Result<String, RepoError> {
        let (base, sha) = self
            .resolve_base()
            .await
            .map_err(step_error(RemediationStep::ResolveBase))?;

        self.create_branch(branch_name, &sha)
            .await
            .map_err(step_error(RemediationStep::CreateBranch(
                branch_name.to_string(),
            )))?;
        info!("Created branch {} from {} ({})", branch_name, base, sha);

        for (written, patch) in patches.iter().enumerate() {
            self.write_file(branch_name, patch)
                .await
                .map_err(step_error(RemediationStep::WriteFile(patch.path.clone())))
                .map_err(after_writes(written, branch_name))?;
            info!("Wrote {} to {}", patch.path, branch_name);
        }

        let url = self
            .open_pull_request(branch_name, &base, title, description)
            .await
            .map_err(step_error(RemediationStep::OpenPullRequest))
            .map_err(after_writes(patches.len(), branch_name))?;
        info!("Opened draft pull request {}", url);
        Ok(url)
    }
}
