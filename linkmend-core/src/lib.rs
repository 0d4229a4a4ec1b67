pub mod config;
pub mod error;
pub mod github;
pub mod remediate;
pub mod repo;
pub mod report;
pub mod scan;

use colored::Colorize;

pub use config::Config;
pub use error::{Error, Result};
pub use github::{GitHubRepository, RepoLocator};
pub use remediate::{
    ManifestEntry, PullRequestText, RemediationOptions, RemediationPlan, build_patches, describe,
    submit,
};
pub use repo::{DocumentRef, DocumentRepository, FilePatch, RemediationStep, RepoError};
pub use report::ReportFormat;
pub use scan::{
    BrokenLinkRecord, ProgressCallback, ScanContext, ScanOptions, ScanPhase, ScanProgress,
    ScanReport, ScanSettings, scan,
};

pub fn print_banner() {
    println!(
        "{} {}",
        "linkmend".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!("{}", "find and fix broken documentation links".dimmed());
    println!();
}
