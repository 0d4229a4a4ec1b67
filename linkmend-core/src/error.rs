use crate::repo::{RemediationStep, RepoError};
use linkmend_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read '{path}': {source}")]
    DocumentFetch {
        path: String,
        #[source]
        source: RepoError,
    },

    #[error("path '{path}' does not exist on branch '{branch}'")]
    PathNotFound { path: String, branch: String },

    #[error("remediation failed while trying to {step}: {message}")]
    RemediationWrite {
        step: RemediationStep,
        message: String,
    },

    #[error("no broken links with a suggested replacement to fix")]
    NothingToFix,

    #[error("scan cancelled after {completed} of {total} documents")]
    Cancelled { completed: usize, total: usize },

    #[error("repository error: {0}")]
    Repository(RepoError),

    #[error(transparent)]
    Scanner(#[from] ScanError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RepoError> for Error {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::PathNotFound { path, branch } => Error::PathNotFound { path, branch },
            RepoError::Step { step, message } => Error::RemediationWrite { step, message },
            other => Error::Repository(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
