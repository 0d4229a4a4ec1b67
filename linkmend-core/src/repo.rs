// The repository holding the documentation sources

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A document as listed by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub path: String,
    /// Backend-specific handle (the blob sha on GitHub).
    pub identifier: String,
}

impl DocumentRef {
    pub fn new(path: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identifier: identifier.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }
}

/// Last component of a `/`-separated repository path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Full replacement body for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    pub path: String,
    pub content: String,
}

/// The individual writes a remediation run performs, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationStep {
    ResolveBase,
    CreateBranch(String),
    WriteFile(String),
    OpenPullRequest,
}

impl fmt::Display for RemediationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationStep::ResolveBase => write!(f, "resolve the base branch"),
            RemediationStep::CreateBranch(branch) => write!(f, "create branch '{}'", branch),
            RemediationStep::WriteFile(path) => write!(f, "write '{}'", path),
            RemediationStep::OpenPullRequest => write!(f, "open the pull request"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("path '{path}' not found on branch '{branch}'")]
    PathNotFound { path: String, branch: String },

    #[error("'{path}' not found")]
    NotFound { path: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not decode '{path}': {message}")]
    Decode { path: String, message: String },

    #[error("failed to {step}: {message}")]
    Step {
        step: RemediationStep,
        message: String,
    },

    #[error("invalid repository locator '{0}'")]
    InvalidLocator(String),

    #[error("documents were read from '{read}' but fixes would be based on '{base}'")]
    BaseMismatch { read: String, base: String },
}

/// Source-control backend the scanner reads documents from and the
/// remediation run writes fixes to.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Human-readable name, e.g. `owner/repo`.
    fn describe(&self) -> String;

    /// Branch documents are read from.
    fn branch(&self) -> &str;

    /// Documents under `path_filter` (a directory or a single file), or the
    /// whole repository. A filter that does not exist is
    /// [`RepoError::PathNotFound`].
    async fn list_documents(
        &self,
        path_filter: Option<&str>,
    ) -> Result<Vec<DocumentRef>, RepoError>;

    /// UTF-8 body of the document at `path`.
    async fn read_document(&self, path: &str) -> Result<String, RepoError>;

    /// Create `branch_name`, write every patch to it and open a draft pull
    /// request. Returns the pull request URL. A failing step is reported as
    /// [`RepoError::Step`]; writes that already happened are not undone.
    async fn write_documents(
        &self,
        branch_name: &str,
        title: &str,
        description: &str,
        patches: &[FilePatch],
    ) -> Result<String, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("docs/guides/intro.md"), "intro.md");
        assert_eq!(file_name("README.md"), "README.md");
        assert_eq!(DocumentRef::new("a/b.md", "sha").file_name(), "b.md");
    }

    #[test]
    fn test_step_display() {
        assert_eq!(
            RemediationStep::WriteFile("docs/a.md".into()).to_string(),
            "write 'docs/a.md'"
        );
        assert_eq!(
            RemediationStep::CreateBranch("fix-1".into()).to_string(),
            "create branch 'fix-1'"
        );
    }
}
